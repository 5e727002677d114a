//! Weapon firing and damage resolution.
//!
//! For each armed, alive unit holding a valid in-range target, every ready
//! weapon discharges: a `WeaponFired` record is emitted, damage lands shield
//! first with the remainder on the hull, and a unit whose hull reaches zero
//! is marked destroyed. Any weapon may fire at any valid target — there is no
//! separate siege-class discrimination, since targeting already guarantees
//! the target is damageable by at least one weapon.
//!
//! Units destroyed earlier in the same tick neither fire nor take further
//! hits; their attackers reacquire next tick.

use std::collections::{BTreeMap, HashMap};

use crate::models::{Unit, UnitId};

use super::delta::{UnitDamaged, UnitDestroyed, WeaponFired};

/// Resolve all weapon discharges for this tick.
///
/// `damaged` keys on the victim id so each victim yields a single delta entry
/// carrying its vitals as of the last hit; the ordered map keeps delta output
/// deterministic.
pub fn run(
    units: &mut [Unit],
    index_of: &HashMap<UnitId, usize>,
    now: f64,
    fired: &mut Vec<WeaponFired>,
    damaged: &mut BTreeMap<UnitId, UnitDamaged>,
    destroyed: &mut Vec<UnitDestroyed>,
) {
    for index in 0..units.len() {
        let attacker = &units[index];
        if !attacker.alive || !attacker.has_weapons {
            continue;
        }
        let Some(target_id) = attacker.target_id else {
            continue;
        };
        let Some(&target_index) = index_of.get(&target_id) else {
            continue;
        };
        if target_index == index || !units[target_index].alive {
            continue;
        }

        let attacker_id = attacker.id;
        let distance = attacker.distance_to(&units[target_index]);
        let target_armor = units[target_index].armor;

        for weapon_index in 0..units[index].weapons.len() {
            let weapon = &units[index].weapons[weapon_index];
            if !weapon.is_ready(now)
                || distance > weapon.max_range
                || !weapon.can_damage(target_armor)
            {
                continue;
            }

            let tag = weapon.tag.clone();
            let impact_time_ms = weapon.impact_time_ms(distance);
            let damage = weapon.damage_per_shot();

            units[index].weapons[weapon_index].last_fired = now;
            fired.push(WeaponFired {
                attacker_id,
                target_id,
                weapon_tag: tag,
                impact_time_ms,
            });

            let outcome = units[target_index].apply_damage(damage);
            units[index].damage_dealt += outcome.dealt;
            damaged.insert(
                target_id,
                UnitDamaged {
                    id: target_id,
                    hp: units[target_index].hp,
                    shield: units[target_index].shield,
                    attacker_id,
                },
            );

            if outcome.destroyed {
                destroyed.push(UnitDestroyed {
                    id: target_id,
                    destroyed_by: attacker_id,
                });
                break;
            }
        }
    }
}
