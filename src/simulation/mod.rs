//! Deterministic per-tick battle simulator.
//!
//! One `Simulator` owns one battle's unit table, spatial index, and RNG. The
//! unit table is a dense vector indexed by a stable internal index with a
//! secondary map from external unit id, so the per-tick phases iterate
//! contiguously even at several thousand units.
//!
//! `step(dt, wall_now)` is a pure function of the simulator state and its
//! inputs: given the same normalized starting state, the same RNG seed, and
//! the same sequence of `(dt, wall_now, external mutations)`, two runs
//! produce identical deltas tick-by-tick. The only randomness is the initial
//! weapon-cooldown stagger drawn at unit construction.

pub mod combat;
pub mod delta;
pub mod movement;
pub mod spatial;
pub mod targeting;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::models::{FactionId, PositionUpdate, Unit, UnitId, UnitRecord};

pub use delta::{TickDelta, UnitDamaged, UnitDestroyed, UnitMoved, WeaponFired};
pub use spatial::SpatialGrid;

/// Default edge length of a spatial grid cell.
pub const DEFAULT_CELL_SIZE: f64 = 500.0;

/// One battle's simulation state.
pub struct Simulator {
    /// Dense unit table; dead units stay in place so final results and
    /// id lookups survive until the battle is torn down.
    units: Vec<Unit>,
    /// External unit id -> dense index.
    index_of: HashMap<UnitId, usize>,
    grid: SpatialGrid,
    rng: StdRng,
}

impl Simulator {
    /// Build a simulator from ingress records, normalizing every unit.
    ///
    /// `seed` pins the weapon-stagger RNG for deterministic replays; when
    /// absent the stagger draws from OS entropy.
    pub fn new(records: Vec<UnitRecord>, now: f64, seed: Option<u64>) -> Self {
        Self::with_cell_size(records, now, seed, DEFAULT_CELL_SIZE)
    }

    /// Build a simulator with an explicit spatial cell size.
    pub fn with_cell_size(
        records: Vec<UnitRecord>,
        now: f64,
        seed: Option<u64>,
        cell_size: f64,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut units = Vec::with_capacity(records.len());
        let mut index_of = HashMap::with_capacity(records.len());
        for record in records {
            if index_of.contains_key(&record.id) {
                log::warn!("duplicate unit id {} dropped at load", record.id);
                continue;
            }
            let unit = Unit::from_record(record, now, &mut rng);
            index_of.insert(unit.id, units.len());
            units.push(unit);
        }

        Self {
            units,
            index_of,
            grid: SpatialGrid::new(cell_size),
            rng,
        }
    }

    /// Advance the battle by `dt` seconds at wall time `now`.
    ///
    /// Phase order is observable by clients: a unit reported in `damaged` is
    /// still alive that tick unless it also appears in `destroyed`.
    pub fn step(&mut self, dt: f64, now: f64) -> TickDelta {
        let mut delta = TickDelta::default();

        // Phase 1: spatial rebuild
        // The index reflects positions at the start of the tick.
        self.grid.rebuild(&self.units);

        // Phase 2: target validation and acquisition
        targeting::run(&mut self.units, &self.index_of, &self.grid);

        // Phase 3: movement
        movement::run(&mut self.units, &self.index_of, dt, &mut delta.moved);

        // Phase 4: weapon firing and damage resolution
        let mut damage_log: BTreeMap<UnitId, UnitDamaged> = BTreeMap::new();
        combat::run(
            &mut self.units,
            &self.index_of,
            now,
            &mut delta.weapons_fired,
            &mut damage_log,
            &mut delta.destroyed,
        );

        // Phase 5: shield regeneration
        for unit in &mut self.units {
            unit.regenerate_shield(dt);
        }

        // Phase 6: delta assembly
        delta.damaged = damage_log.into_values().collect();
        delta.is_idle = self.idle_after_quiet_tick(&delta, now);
        delta
    }

    /// A quiet tick is idle when nothing can happen before an external
    /// mutation or a future weapon-ready time. With no engaged unit the
    /// state is a fixed point and the tick is always idle; with engagements
    /// pending, idling is only safe while every weapon is still cooling down.
    fn idle_after_quiet_tick(&self, delta: &TickDelta, now: f64) -> bool {
        if !delta.is_quiet() {
            return false;
        }
        let engaged = self
            .units
            .iter()
            .any(|u| u.alive && u.has_weapons && u.target_id.is_some());
        if !engaged {
            return true;
        }
        match self.next_weapon_ready_time() {
            Some(ready) => ready > now,
            None => true,
        }
    }

    // ==================== Queries ====================

    /// Factions that still field at least one alive unit.
    pub fn active_factions(&self) -> BTreeSet<FactionId> {
        self.units
            .iter()
            .filter(|u| u.alive)
            .map(|u| u.faction_id)
            .collect()
    }

    /// The battle is decided once at most one faction remains active.
    pub fn is_battle_ended(&self) -> bool {
        self.active_factions().len() <= 1
    }

    /// Earliest wall time at which any alive armed unit's weapon comes off
    /// cooldown, or `None` when no such unit exists.
    pub fn next_weapon_ready_time(&self) -> Option<f64> {
        self.units
            .iter()
            .filter(|u| u.alive && u.has_weapons)
            .filter_map(Unit::next_ready_time)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Current positions of all alive units, for state dumps.
    pub fn unit_positions(&self) -> Vec<UnitMoved> {
        self.units
            .iter()
            .filter(|u| u.alive)
            .map(|u| UnitMoved {
                id: u.id,
                x: u.position.x,
                y: u.position.y,
                z: u.position.z,
            })
            .collect()
    }

    /// Final unit records, dead and alive, for result reporting.
    pub fn results(&self) -> Vec<UnitRecord> {
        self.units.iter().map(Unit::to_record).collect()
    }

    /// Number of alive units.
    pub fn alive_count(&self) -> usize {
        self.units.iter().filter(|u| u.alive).count()
    }

    /// Total number of units in the table, dead included.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Look up a unit by external id.
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.index_of.get(&id).map(|&index| &self.units[index])
    }

    // ==================== External mutations ====================

    /// Normalize and insert a reinforcement. Returns false when the id is
    /// already present; ids are unique for the lifetime of a battle.
    pub fn add_unit(&mut self, record: UnitRecord, now: f64) -> bool {
        if self.index_of.contains_key(&record.id) {
            log::warn!("reinforcement with duplicate unit id {} rejected", record.id);
            return false;
        }
        let unit = Unit::from_record(record, now, &mut self.rng);
        self.index_of.insert(unit.id, self.units.len());
        self.units.push(unit);
        true
    }

    /// Overwrite positions for the listed units. Returns how many were
    /// applied; unknown ids are skipped.
    pub fn update_positions(&mut self, updates: &[PositionUpdate]) -> usize {
        let mut applied = 0;
        for update in updates {
            let Some(&index) = self.index_of.get(&update.id) else {
                continue;
            };
            let unit = &mut self.units[index];
            unit.position.x = update.x;
            unit.position.y = update.y;
            unit.position.z = update.z;
            if update.clear_target {
                unit.target_id = None;
            }
            applied += 1;
        }
        applied
    }

    /// Convenience variant of [`update_positions`](Self::update_positions)
    /// for a single unit.
    pub fn update_single_position(
        &mut self,
        id: UnitId,
        x: f64,
        y: f64,
        z: f64,
        clear_target: bool,
    ) -> bool {
        self.update_positions(&[PositionUpdate {
            id,
            x,
            y,
            z,
            clear_target,
        }]) == 1
    }

    /// Drop every unit's target and reacquire against current positions.
    /// Used when external position changes invalidate the spatial premise
    /// en masse.
    pub fn force_retarget(&mut self) {
        for unit in &mut self.units {
            unit.target_id = None;
        }
        self.grid.rebuild(&self.units);
        targeting::run(&mut self.units, &self.index_of, &self.grid);
    }
}
