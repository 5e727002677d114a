//! Target validation and acquisition.
//!
//! Runs once per tick after the spatial rebuild. Every armed, alive unit ends
//! the phase holding a valid target id whenever one is reachable: stale
//! targets are dropped and replaced by the nearest damageable enemy.
//!
//! A target id is valid iff the target exists, is alive, belongs to a
//! different faction, lies within the holder's `max_weapon_range`, and at
//! least one of the holder's weapons can damage its armor.

use std::collections::HashMap;

use crate::models::{Unit, UnitId};

use super::spatial::SpatialGrid;

/// Below this many grid candidates, acquisition falls back to a linear scan
/// of all alive enemies. Grid-cell starvation at large weapon ranges would
/// otherwise make targeting fail.
pub const FALLBACK_CANDIDATE_THRESHOLD: usize = 5;

/// Validate existing targets and acquire new ones where needed.
pub fn run(units: &mut [Unit], index_of: &HashMap<UnitId, usize>, grid: &SpatialGrid) {
    let mut assignments: Vec<(usize, Option<UnitId>)> = Vec::new();
    let mut scratch: Vec<usize> = Vec::new();

    for index in 0..units.len() {
        let unit = &units[index];
        if !unit.alive || !unit.has_weapons {
            continue;
        }

        if let Some(target_id) = unit.target_id {
            if is_valid_target(unit, target_id, units, index_of) {
                continue;
            }
        }

        let acquired = acquire(unit, units, grid, &mut scratch);
        if acquired != unit.target_id {
            assignments.push((index, acquired));
        }
    }

    for (index, target) in assignments {
        units[index].target_id = target;
    }
}

/// Check whether `target_id` is still a legal target for `unit`.
pub fn is_valid_target(
    unit: &Unit,
    target_id: UnitId,
    units: &[Unit],
    index_of: &HashMap<UnitId, usize>,
) -> bool {
    let Some(&target_index) = index_of.get(&target_id) else {
        return false;
    };
    let target = &units[target_index];
    target.alive
        && target.faction_id != unit.faction_id
        && unit.distance_to(target) <= unit.max_weapon_range
        && unit.can_damage(target.armor)
}

/// Pick the best target for `unit`, or `None` when no enemy qualifies.
///
/// Scoring is nearest-first with exact distance ties broken by lower unit id.
/// Stations carry no penalty, so a station sitting next to an armed ship is
/// acquired just as readily as the ship.
fn acquire(unit: &Unit, units: &[Unit], grid: &SpatialGrid, scratch: &mut Vec<usize>) -> Option<UnitId> {
    grid.nearby_into(&unit.position, unit.max_weapon_range, scratch);

    let mut best: Option<(f64, UnitId)> = None;
    if scratch.len() >= FALLBACK_CANDIDATE_THRESHOLD {
        for &candidate in scratch.iter() {
            consider(unit, &units[candidate], &mut best);
        }
    } else {
        // Too few grid candidates to trust the prefilter.
        for candidate in units {
            consider(unit, candidate, &mut best);
        }
    }

    best.map(|(_, id)| id)
}

fn consider(unit: &Unit, candidate: &Unit, best: &mut Option<(f64, UnitId)>) {
    if candidate.id == unit.id
        || !candidate.alive
        || candidate.faction_id == unit.faction_id
        || !unit.can_damage(candidate.armor)
    {
        return;
    }
    let distance = unit.distance_to(candidate);
    if distance > unit.max_weapon_range {
        return;
    }
    let better = match best {
        None => true,
        Some((best_distance, best_id)) => {
            distance < *best_distance || (distance == *best_distance && candidate.id < *best_id)
        }
    };
    if better {
        *best = Some((distance, candidate.id));
    }
}
