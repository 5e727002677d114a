//! Battle manager
//!
//! Owns the set of live battles and every control operation against them.
//! One scheduler task drives `tick_all`; API handlers call the mutation and
//! query methods through `SharedBattleManager`. Events produced by either
//! path accumulate in the manager's queue until the scheduler drains and
//! broadcasts them.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use log::{error, info, warn};

use crate::config::SimulationSettings;
use crate::error::{BattleError, BattleResult};
use crate::events::{BattleEvent, EventQueue, ReinforcementInfo};
use crate::models::{PositionUpdate, SystemId, UnitId, UnitRecord};

use super::{Battle, BattleStatus, BattleSummary};

/// Thread-safe wrapper for the battle manager
///
/// This allows the API handlers and the scheduler task to access the manager
/// safely using Arc<RwLock<BattleManager>>.
pub type SharedBattleManager = Arc<RwLock<BattleManager>>;

/// Central registry and coordinator for all battles
pub struct BattleManager {
    /// Battle registry (battle id -> Battle)
    battles: HashMap<String, Battle>,

    /// Scheduler and simulator tuning
    settings: SimulationSettings,

    /// Events awaiting broadcast
    events: EventQueue,

    /// Wall-clock epoch; all battle times are seconds since this instant
    epoch: Instant,
}

impl BattleManager {
    /// Create a new battle manager
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            battles: HashMap::new(),
            settings,
            events: EventQueue::new(),
            epoch: Instant::now(),
        }
    }

    /// Create a new thread-safe shared battle manager
    pub fn new_shared(settings: SimulationSettings) -> SharedBattleManager {
        Arc::new(RwLock::new(Self::new(settings)))
    }

    /// Seconds elapsed since the manager's epoch
    pub fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Milliseconds the manager has been running
    pub fn uptime_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Scheduler and simulator tuning knobs
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Number of battles in the registry, ended-but-retained included
    pub fn battle_count(&self) -> usize {
        self.battles.len()
    }

    /// Number of battles still running
    pub fn live_battle_count(&self) -> usize {
        self.battles.values().filter(|b| !b.ended).count()
    }

    // ==================== Control operations ====================

    /// Start a new battle from ingress records.
    ///
    /// An empty unit list is accepted; such a battle concludes on its first
    /// tick with no victor.
    pub fn start_battle(
        &mut self,
        battle_id: String,
        system_id: SystemId,
        units: Vec<UnitRecord>,
        seed: Option<u64>,
    ) -> BattleResult<()> {
        let now = self.now_secs();
        self.start_battle_at(battle_id, system_id, units, seed, now)
    }

    /// Explicit wall-clock variant of [`start_battle`](Self::start_battle),
    /// used by deterministic tests and embedding callers that own the clock.
    pub fn start_battle_at(
        &mut self,
        battle_id: String,
        system_id: SystemId,
        units: Vec<UnitRecord>,
        seed: Option<u64>,
        now: f64,
    ) -> BattleResult<()> {
        if battle_id.is_empty() {
            return Err(BattleError::InvalidPayload("battle_id is empty".to_string()));
        }
        if self.battles.contains_key(&battle_id) {
            return Err(BattleError::InvalidPayload(format!(
                "battle '{}' already exists",
                battle_id
            )));
        }

        let battle = Battle::new(
            battle_id.clone(),
            system_id,
            units,
            now,
            seed,
            &self.settings,
        );
        let unit_count = battle.simulator.alive_count();
        let factions: Vec<_> = battle.simulator.active_factions().into_iter().collect();
        info!(
            "Battle '{}' started in system {} with {} units across {} factions",
            battle_id,
            system_id,
            unit_count,
            factions.len()
        );

        self.events.push(BattleEvent::Started {
            battle_id: battle_id.clone(),
            system_id,
            unit_count,
            factions,
        });
        self.battles.insert(battle_id, battle);
        Ok(())
    }

    /// Add reinforcements to an existing, non-ended battle.
    pub fn reinforce(&mut self, battle_id: &str, units: Vec<UnitRecord>) -> BattleResult<usize> {
        let now = self.now_secs();
        let battle = self.live_battle_mut(battle_id)?;

        let mut added = Vec::new();
        for record in units {
            let info = ReinforcementInfo {
                id: record.id,
                faction_id: record.faction_id,
                player_id: record.player_id,
            };
            if battle.simulator.add_unit(record, now) {
                added.push(info);
            }
        }
        battle.wake();

        let count = added.len();
        let event = BattleEvent::Reinforcements {
            battle_id: battle.battle_id.clone(),
            system_id: battle.system_id,
            reinforcements: added,
        };
        self.events.push(event);
        Ok(count)
    }

    /// Overwrite positions for the listed units of a battle.
    pub fn update_positions(
        &mut self,
        battle_id: &str,
        updates: &[PositionUpdate],
    ) -> BattleResult<usize> {
        let battle = self.live_battle_mut(battle_id)?;
        let applied = battle.simulator.update_positions(updates);
        battle.wake();
        Ok(applied)
    }

    /// Overwrite one unit's position.
    pub fn update_single_position(
        &mut self,
        battle_id: &str,
        id: UnitId,
        x: f64,
        y: f64,
        z: f64,
        clear_target: bool,
    ) -> BattleResult<()> {
        let battle = self.live_battle_mut(battle_id)?;
        if !battle.simulator.update_single_position(id, x, y, z, clear_target) {
            warn!("position update for unknown unit {} in battle '{}'", id, battle_id);
        }
        battle.wake();
        Ok(())
    }

    /// Drop every target in a battle and reacquire immediately.
    pub fn force_retarget(&mut self, battle_id: &str) -> BattleResult<()> {
        let battle = self.live_battle_mut(battle_id)?;
        battle.simulator.force_retarget();
        battle.wake();
        Ok(())
    }

    /// Stop a battle on request. Stopping an already-ended battle is a no-op.
    pub fn stop_battle(&mut self, battle_id: &str) -> BattleResult<()> {
        let now = self.now_secs();
        let battle = self
            .battles
            .get_mut(battle_id)
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.to_string()))?;
        if let Some(event) = battle.finalize("stopped_by_request", now) {
            info!("Battle '{}' stopped by request", battle_id);
            self.events.push(event);
        }
        Ok(())
    }

    /// Status for one battle, including final results while retained.
    pub fn status(&self, battle_id: &str) -> Option<BattleStatus> {
        let now = self.now_secs();
        self.battles.get(battle_id).map(|b| b.status(now))
    }

    /// Summaries of all battles still running.
    pub fn active_battles(&self) -> Vec<BattleSummary> {
        let now = self.now_secs();
        let mut summaries: Vec<BattleSummary> = self
            .battles
            .values()
            .filter(|b| !b.ended)
            .map(|b| b.summary(now))
            .collect();
        summaries.sort_by(|a, b| a.battle_id.cmp(&b.battle_id));
        summaries
    }

    // ==================== Scheduler entry points ====================

    /// Advance every battle that is due. Called by the scheduler each period.
    pub fn tick_all(&mut self) {
        let now = self.now_secs();
        self.tick_all_at(now);
    }

    /// Explicit wall-clock variant of [`tick_all`](Self::tick_all).
    pub fn tick_all_at(&mut self, now: f64) {
        let idle_check_secs = self.settings.idle_check_ms as f64 / 1000.0;
        let retention_secs = self.settings.retention_secs;
        let settings = self.settings.clone();

        let mut events = Vec::new();
        let mut purge = Vec::new();

        for battle in self.battles.values_mut() {
            if battle.ended {
                if now - battle.ended_at > retention_secs {
                    purge.push(battle.battle_id.clone());
                }
                continue;
            }

            // Timeouts run on absolute wall time, idle or not.
            if let Some(reason) = battle.check_timeout(now, &settings) {
                warn!("Battle '{}' terminated: {}", battle.battle_id, reason);
                events.extend(battle.finalize(&reason, now));
                continue;
            }

            if battle.idle {
                if now - battle.last_idle_check < idle_check_secs {
                    continue;
                }
                battle.last_idle_check = now;
                if now < battle.next_weapon_ready {
                    continue;
                }
                battle.wake();
            }

            let delta = match catch_unwind(AssertUnwindSafe(|| battle.run_tick(now))) {
                Ok(delta) => delta,
                Err(_) => {
                    error!(
                        "Simulation step panicked for battle '{}'; terminating it",
                        battle.battle_id
                    );
                    events.extend(battle.finalize("step_failure", now));
                    continue;
                }
            };

            events.push(BattleEvent::Tick {
                battle_id: battle.battle_id.clone(),
                system_id: battle.system_id,
                tick: battle.tick,
                moved: delta.moved,
                damaged: delta.damaged,
                destroyed: delta.destroyed,
                weapons_fired: delta.weapons_fired,
            });

            if battle.simulator.is_battle_ended() {
                events.extend(battle.finalize("combat_resolved", now));
            }
        }

        for battle_id in purge {
            self.battles.remove(&battle_id);
            info!("Battle '{}' purged after retention window", battle_id);
        }
        self.events.extend(events);
    }

    /// End every live battle ahead of process exit.
    pub fn shutdown(&mut self) {
        let now = self.now_secs();
        let mut events = Vec::new();
        for battle in self.battles.values_mut() {
            events.extend(battle.finalize("server_shutdown", now));
        }
        info!("Shutdown: concluded {} live battles", events.len());
        self.events.extend(events);
    }

    /// Take all pending events for broadcast.
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        self.events.drain()
    }

    fn live_battle_mut(&mut self, battle_id: &str) -> BattleResult<&mut Battle> {
        let battle = self
            .battles
            .get_mut(battle_id)
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.to_string()))?;
        if battle.ended {
            return Err(BattleError::BattleEnded(battle_id.to_string()));
        }
        Ok(battle)
    }
}
