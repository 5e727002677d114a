//! Battle lifecycle state.
//!
//! A `Battle` pairs one simulator with the bookkeeping the manager needs:
//! tick and wall-time tracking, idle state, timeout evaluation, aggregate
//! statistics, and idempotent end-of-battle finalization. All wall times are
//! seconds since the manager's epoch.

pub mod manager;
pub mod scheduler;

use serde::{Deserialize, Serialize};

use crate::config::SimulationSettings;
use crate::events::BattleEvent;
use crate::models::{FactionId, SystemId, UnitId, UnitRecord};
use crate::simulation::{Simulator, TickDelta};

/// Running aggregates merged from each tick's delta.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BattleStats {
    pub ticks: u64,
    pub shots_fired: u64,
    pub units_destroyed: u64,
}

/// Final outcome of a concluded battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleResults {
    pub survivors: Vec<UnitId>,
    pub casualties: Vec<UnitId>,
    pub victor: Option<FactionId>,
    pub reason: String,
    /// Final snapshot of every unit, dead and alive.
    pub units: Vec<UnitRecord>,
}

/// Status answer for one battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleStatus {
    pub found: bool,
    pub battle_id: String,
    pub system_id: SystemId,
    pub tick: u64,
    pub duration_ms: u64,
    pub ended: bool,
    pub unit_count: usize,
    pub factions: Vec<FactionId>,
    pub is_idle: bool,
    pub stats: BattleStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BattleResults>,
}

/// One-line summary used by the active-battles listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSummary {
    pub battle_id: String,
    pub system_id: SystemId,
    pub tick: u64,
    pub duration_ms: u64,
    pub unit_count: usize,
    pub factions: Vec<FactionId>,
    pub is_idle: bool,
}

/// One simulation instance plus its manager-side bookkeeping.
pub struct Battle {
    pub battle_id: String,
    pub system_id: SystemId,
    pub simulator: Simulator,
    pub tick: u64,
    pub start_time: f64,
    pub last_tick_time: f64,
    /// Updated only when damage or a destruction occurs.
    pub last_damage_time: f64,
    pub last_timeout_check: f64,
    pub idle: bool,
    pub last_idle_check: f64,
    /// Earliest wall time a weapon comes off cooldown, captured when the
    /// battle went idle. Infinity when no armed unit remains.
    pub next_weapon_ready: f64,
    pub stats: BattleStats,
    pub ended: bool,
    pub ended_at: f64,
    pub results: Option<BattleResults>,
}

impl Battle {
    /// Register a new battle at wall time `now`. Units are normalized and
    /// their weapon cooldowns staggered by the simulator.
    pub fn new(
        battle_id: String,
        system_id: SystemId,
        units: Vec<UnitRecord>,
        now: f64,
        seed: Option<u64>,
        settings: &SimulationSettings,
    ) -> Self {
        let simulator = Simulator::with_cell_size(units, now, seed, settings.grid_cell_size);
        Self {
            battle_id,
            system_id,
            simulator,
            tick: 0,
            start_time: now,
            last_tick_time: now,
            last_damage_time: now,
            last_timeout_check: now,
            idle: false,
            last_idle_check: now,
            next_weapon_ready: f64::INFINITY,
            stats: BattleStats::default(),
            ended: false,
            ended_at: 0.0,
            results: None,
        }
    }

    /// Run one tick at wall time `now`, with `dt` derived from the wall
    /// clock so idle gaps are integrated rather than lost.
    pub fn run_tick(&mut self, now: f64) -> TickDelta {
        let dt = (now - self.last_tick_time).max(0.0);
        let delta = self.simulator.step(dt, now);

        self.tick += 1;
        self.last_tick_time = now;
        if !delta.damaged.is_empty() || !delta.destroyed.is_empty() {
            self.last_damage_time = now;
        }

        self.stats.ticks += 1;
        self.stats.shots_fired += delta.weapons_fired.len() as u64;
        self.stats.units_destroyed += delta.destroyed.len() as u64;

        if delta.is_idle {
            self.idle = true;
            self.last_idle_check = now;
            self.next_weapon_ready = self
                .simulator
                .next_weapon_ready_time()
                .unwrap_or(f64::INFINITY);
        } else {
            self.idle = false;
        }

        delta
    }

    /// Force the battle out of idle mode. Every external mutation calls this.
    pub fn wake(&mut self) {
        self.idle = false;
    }

    /// Evaluate the wall-clock termination policies. Returns the termination
    /// reason when one fires. Runs at most once per check period, and uses
    /// absolute time so it survives idle skipping.
    pub fn check_timeout(&mut self, now: f64, settings: &SimulationSettings) -> Option<String> {
        if now - self.last_timeout_check < settings.timeout_check_secs {
            return None;
        }
        self.last_timeout_check = now;

        if now - self.start_time > settings.max_battle_secs {
            let minutes = (settings.max_battle_secs / 60.0).round() as u64;
            return Some(format!("max_duration_exceeded_{}m", minutes));
        }
        if now - self.last_damage_time > settings.stalemate_secs {
            let minutes = (settings.stalemate_secs / 60.0).round() as u64;
            return Some(format!("stalemate_no_damage_{}m", minutes));
        }
        None
    }

    /// Conclude the battle and build the `battle:concluded` event.
    ///
    /// Idempotent: a second attempt is a no-op and returns `None`.
    pub fn finalize(&mut self, reason: &str, now: f64) -> Option<BattleEvent> {
        if self.ended {
            return None;
        }
        self.ended = true;
        self.ended_at = now;

        let units = self.simulator.results();
        let survivors: Vec<UnitId> = units
            .iter()
            .filter(|u| u.alive == Some(true))
            .map(|u| u.id)
            .collect();
        let casualties: Vec<UnitId> = units
            .iter()
            .filter(|u| u.alive != Some(true))
            .map(|u| u.id)
            .collect();
        let active = self.simulator.active_factions();
        let victor = if active.len() == 1 {
            active.iter().next().copied()
        } else {
            None
        };

        let results = BattleResults {
            survivors: survivors.clone(),
            casualties: casualties.clone(),
            victor,
            reason: reason.to_string(),
            units,
        };
        let event = BattleEvent::Concluded {
            battle_id: self.battle_id.clone(),
            system_id: self.system_id,
            duration_ms: self.duration_ms(now),
            total_ticks: self.tick,
            survivors,
            casualties,
            victor,
            reason: reason.to_string(),
        };
        self.results = Some(results);
        Some(event)
    }

    /// Elapsed battle duration in milliseconds. Frozen at conclusion.
    pub fn duration_ms(&self, now: f64) -> u64 {
        let end = if self.ended { self.ended_at } else { now };
        ((end - self.start_time).max(0.0) * 1000.0) as u64
    }

    /// Build the status answer for this battle.
    pub fn status(&self, now: f64) -> BattleStatus {
        BattleStatus {
            found: true,
            battle_id: self.battle_id.clone(),
            system_id: self.system_id,
            tick: self.tick,
            duration_ms: self.duration_ms(now),
            ended: self.ended,
            unit_count: self.simulator.alive_count(),
            factions: self.simulator.active_factions().into_iter().collect(),
            is_idle: self.idle,
            stats: self.stats,
            results: self.results.clone(),
        }
    }

    /// Build the one-line summary for the active-battles listing.
    pub fn summary(&self, now: f64) -> BattleSummary {
        BattleSummary {
            battle_id: self.battle_id.clone(),
            system_id: self.system_id,
            tick: self.tick,
            duration_ms: self.duration_ms(now),
            unit_count: self.simulator.alive_count(),
            factions: self.simulator.active_factions().into_iter().collect(),
            is_idle: self.idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeaponRecord;

    fn settings() -> SimulationSettings {
        SimulationSettings::default()
    }

    fn laser() -> WeaponRecord {
        WeaponRecord {
            tag: "laser".to_string(),
            dps: 10.0,
            fire_rate: 1.0,
            max_range: 100.0,
            optimal_range: 50.0,
            target_armor_max: 0.0,
            cooldown: None,
            last_fired: -1.0,
        }
    }

    fn record(id: u64, faction_id: u32, x: f64, weapons: Vec<WeaponRecord>) -> UnitRecord {
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
            max_speed: 10.0,
            weapons,
            max_weapon_range: 0.0,
            target_id: None,
            alive: None,
            damage_dealt: 0.0,
            damage_taken: 0.0,
        }
    }

    fn two_sided_battle(now: f64) -> Battle {
        Battle::new(
            "b-1".to_string(),
            42,
            vec![
                record(1, 1, 0.0, vec![laser()]),
                record(2, 2, 10.0, vec![]),
            ],
            now,
            Some(5),
            &settings(),
        )
    }

    #[test]
    fn run_tick_advances_and_merges_stats() {
        let mut battle = two_sided_battle(0.0);
        let delta = battle.run_tick(0.05);

        assert_eq!(battle.tick, 1);
        assert_eq!(battle.last_tick_time, 0.05);
        assert_eq!(battle.stats.ticks, 1);
        assert_eq!(battle.stats.shots_fired, 1);
        assert_eq!(delta.weapons_fired.len(), 1);
        assert_eq!(battle.last_damage_time, 0.05);
    }

    #[test]
    fn max_duration_timeout_uses_wall_time() {
        let mut battle = two_sided_battle(0.0);
        // Under the limit: nothing fires even after the check period.
        assert_eq!(battle.check_timeout(100.0, &settings()), None);
        // Past 30 minutes: the absolute cap fires.
        battle.last_damage_time = 1801.0;
        let reason = battle.check_timeout(1801.0, &settings()).unwrap();
        assert_eq!(reason, "max_duration_exceeded_30m");
    }

    #[test]
    fn stalemate_timeout_tracks_last_damage() {
        let mut battle = two_sided_battle(0.0);
        battle.last_damage_time = 10.0;
        assert_eq!(battle.check_timeout(250.0, &settings()), None);
        let reason = battle.check_timeout(311.0, &settings()).unwrap();
        assert_eq!(reason, "stalemate_no_damage_5m");
    }

    #[test]
    fn timeout_checks_are_rate_limited() {
        let mut battle = two_sided_battle(0.0);
        battle.last_damage_time = -1000.0;
        // First call within the check period does nothing.
        assert_eq!(battle.check_timeout(5.0, &settings()), None);
        assert_eq!(battle.check_timeout(9.0, &settings()), None);
        assert!(battle.check_timeout(15.0, &settings()).is_some());
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut battle = two_sided_battle(0.0);
        let event = battle.finalize("stopped_by_request", 1.0);
        assert!(event.is_some());
        assert!(battle.ended);
        assert!(battle.results.is_some());

        let second = battle.finalize("stopped_by_request", 2.0);
        assert!(second.is_none());
        assert_eq!(battle.ended_at, 1.0);
    }

    #[test]
    fn finalize_derives_victor_and_casualties() {
        let mut battle = Battle::new(
            "b-1".to_string(),
            42,
            vec![
                {
                    let mut r = record(1, 1, 0.0, vec![laser()]);
                    r.weapons[0].dps = 1000.0;
                    r
                },
                record(2, 2, 10.0, vec![]),
            ],
            0.0,
            Some(5),
            &settings(),
        );
        battle.run_tick(0.05);
        assert!(battle.simulator.is_battle_ended());

        let event = battle.finalize("combat_resolved", 0.05).unwrap();
        match event {
            BattleEvent::Concluded {
                survivors,
                casualties,
                victor,
                reason,
                ..
            } => {
                assert_eq!(survivors, vec![1]);
                assert_eq!(casualties, vec![2]);
                assert_eq!(victor, Some(1));
                assert_eq!(reason, "combat_resolved");
            }
            _ => panic!("expected concluded event"),
        }
    }

    #[test]
    fn idle_tick_records_next_ready_time() {
        let mut battle = Battle::new(
            "b-1".to_string(),
            42,
            vec![
                record(1, 1, 0.0, vec![laser()]),
                record(2, 2, 10_000.0, vec![laser()]),
            ],
            0.0,
            Some(5),
            &settings(),
        );
        let delta = battle.run_tick(0.05);
        assert!(delta.is_idle);
        assert!(battle.idle);

        battle.wake();
        assert!(!battle.idle);
    }

    #[test]
    fn duration_freezes_at_conclusion() {
        let mut battle = two_sided_battle(0.0);
        battle.finalize("stopped_by_request", 2.0);
        assert_eq!(battle.duration_ms(50.0), 2000);
    }

    #[test]
    fn status_reports_results_after_end() {
        let mut battle = two_sided_battle(0.0);
        assert!(battle.status(1.0).results.is_none());
        battle.finalize("stopped_by_request", 2.0);
        let status = battle.status(3.0);
        assert!(status.ended);
        assert!(status.results.is_some());
    }
}
