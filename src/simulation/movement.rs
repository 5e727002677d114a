//! Straight-line movement toward out-of-optimal-range targets.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::models::{Unit, UnitId};

use super::delta::UnitMoved;

/// Advance every alive, targeted unit toward its target, stopping at the
/// unit's optimal weapon range. Units without targets hold position, and
/// stations never move.
pub fn run(
    units: &mut [Unit],
    index_of: &HashMap<UnitId, usize>,
    dt: f64,
    moved: &mut Vec<UnitMoved>,
) {
    if dt <= 0.0 {
        return;
    }

    for index in 0..units.len() {
        let unit = &units[index];
        if !unit.alive || unit.is_station {
            continue;
        }
        let Some(target_id) = unit.target_id else {
            continue;
        };
        let Some(&target_index) = index_of.get(&target_id) else {
            continue;
        };
        if !units[target_index].alive {
            continue;
        }

        let target_position = units[target_index].position;
        let optimal = units[index].optimal_range();
        let offset = target_position - units[index].position;
        let distance = offset.norm();
        if distance <= optimal || distance <= f64::EPSILON {
            units[index].velocity = Vector3::zeros();
            continue;
        }

        // Never close past optimal range in a single step.
        let step = (units[index].max_speed * dt).min(distance - optimal);
        if step <= 0.0 {
            units[index].velocity = Vector3::zeros();
            continue;
        }

        let direction = offset / distance;
        let unit = &mut units[index];
        unit.position += direction * step;
        unit.velocity = direction * (step / dt);
        moved.push(UnitMoved {
            id: unit.id,
            x: unit.position.x,
            y: unit.position.y,
            z: unit.position.z,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UnitRecord, WeaponRecord};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn record(id: u64, faction_id: u32, x: f64, max_speed: f64) -> UnitRecord {
        UnitRecord {
            id,
            faction_id,
            player_id: None,
            unit_type: "frigate".to_string(),
            is_ship: None,
            is_station: None,
            max_hp: 100.0,
            hp: 100.0,
            max_shield: 0.0,
            shield: 0.0,
            armor: 0.0,
            shield_regen: 0.0,
            pos_x: x,
            pos_y: 0.0,
            pos_z: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            vel_z: 0.0,
            max_speed,
            weapons: vec![WeaponRecord {
                tag: "laser".to_string(),
                dps: 10.0,
                fire_rate: 1.0,
                max_range: 100.0,
                optimal_range: 50.0,
                target_armor_max: 0.0,
                cooldown: None,
                last_fired: -1.0,
            }],
            max_weapon_range: 0.0,
            target_id: None,
            alive: None,
            damage_dealt: 0.0,
            damage_taken: 0.0,
        }
    }

    fn build(records: Vec<UnitRecord>) -> (Vec<Unit>, HashMap<UnitId, usize>) {
        let mut rng = StdRng::seed_from_u64(1);
        let units: Vec<Unit> = records
            .into_iter()
            .map(|r| Unit::from_record(r, 0.0, &mut rng))
            .collect();
        let index_of = units.iter().enumerate().map(|(i, u)| (u.id, i)).collect();
        (units, index_of)
    }

    #[test]
    fn closes_toward_target_at_max_speed() {
        let (mut units, index_of) = build(vec![record(1, 1, 0.0, 20.0), record(2, 2, 200.0, 0.0)]);
        units[0].target_id = Some(2);

        let mut moved = Vec::new();
        run(&mut units, &index_of, 1.0, &mut moved);

        assert_eq!(units[0].position.x, 20.0);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, 1);
        assert_eq!(moved[0].x, 20.0);
        assert_eq!(units[0].velocity.x, 20.0);
    }

    #[test]
    fn never_closes_past_optimal_range() {
        let (mut units, index_of) = build(vec![record(1, 1, 0.0, 1000.0), record(2, 2, 60.0, 0.0)]);
        units[0].target_id = Some(2);

        let mut moved = Vec::new();
        run(&mut units, &index_of, 1.0, &mut moved);

        // Target at 60, optimal 50: the step is capped at 10.
        assert_eq!(units[0].position.x, 10.0);
    }

    #[test]
    fn holds_position_inside_optimal_range() {
        let (mut units, index_of) = build(vec![record(1, 1, 0.0, 20.0), record(2, 2, 30.0, 0.0)]);
        units[0].target_id = Some(2);
        units[0].velocity.x = 5.0;

        let mut moved = Vec::new();
        run(&mut units, &index_of, 1.0, &mut moved);

        assert_eq!(units[0].position.x, 0.0);
        assert_eq!(units[0].velocity.x, 0.0);
        assert!(moved.is_empty());
    }

    #[test]
    fn untargeted_units_do_not_move() {
        let (mut units, index_of) = build(vec![record(1, 1, 0.0, 20.0), record(2, 2, 200.0, 0.0)]);
        let mut moved = Vec::new();
        run(&mut units, &index_of, 1.0, &mut moved);
        assert!(moved.is_empty());
        assert_eq!(units[0].position.x, 0.0);
    }

    #[test]
    fn stations_never_move() {
        let mut station = record(1, 1, 0.0, 20.0);
        station.unit_type = "weapons platform".to_string();
        let (mut units, index_of) = build(vec![station, record(2, 2, 200.0, 0.0)]);
        units[0].target_id = Some(2);

        let mut moved = Vec::new();
        run(&mut units, &index_of, 1.0, &mut moved);
        assert!(units[0].is_station);
        assert!(moved.is_empty());
        assert_eq!(units[0].position.x, 0.0);
    }

    #[test]
    fn zero_dt_is_a_no_op() {
        let (mut units, index_of) = build(vec![record(1, 1, 0.0, 20.0), record(2, 2, 200.0, 0.0)]);
        units[0].target_id = Some(2);
        let mut moved = Vec::new();
        run(&mut units, &index_of, 0.0, &mut moved);
        assert!(moved.is_empty());
    }
}
