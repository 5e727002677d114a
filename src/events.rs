//! Event system for real-time updates to clients
//!
//! This module defines all battle events that can be broadcast to clients.
//! Events are serialized to JSON and sent to subscribed clients scoped by the
//! solar system a battle runs in.

use serde::{Deserialize, Serialize};

use crate::models::{FactionId, PlayerId, SystemId, UnitId};
use crate::simulation::{UnitDamaged, UnitDestroyed, UnitMoved, WeaponFired};

/// Events that occur over the lifetime of a battle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BattleEvent {
    /// A new battle started
    #[serde(rename = "battle:started")]
    Started {
        battle_id: String,
        system_id: SystemId,
        unit_count: usize,
        factions: Vec<FactionId>,
    },

    /// One tick's delta
    #[serde(rename = "battle:tick")]
    Tick {
        battle_id: String,
        system_id: SystemId,
        tick: u64,
        moved: Vec<UnitMoved>,
        damaged: Vec<UnitDamaged>,
        destroyed: Vec<UnitDestroyed>,
        weapons_fired: Vec<WeaponFired>,
    },

    /// Reinforcements joined an ongoing battle
    #[serde(rename = "battle:reinforcements")]
    Reinforcements {
        battle_id: String,
        system_id: SystemId,
        reinforcements: Vec<ReinforcementInfo>,
    },

    /// The battle finished, by resolution, timeout, or explicit stop
    #[serde(rename = "battle:concluded")]
    Concluded {
        battle_id: String,
        system_id: SystemId,
        duration_ms: u64,
        total_ticks: u64,
        survivors: Vec<UnitId>,
        casualties: Vec<UnitId>,
        victor: Option<FactionId>,
        reason: String,
    },
}

impl BattleEvent {
    /// The battle this event belongs to.
    pub fn battle_id(&self) -> &str {
        match self {
            BattleEvent::Started { battle_id, .. }
            | BattleEvent::Tick { battle_id, .. }
            | BattleEvent::Reinforcements { battle_id, .. }
            | BattleEvent::Concluded { battle_id, .. } => battle_id,
        }
    }

    /// The system scope this event is published under.
    pub fn system_id(&self) -> SystemId {
        match self {
            BattleEvent::Started { system_id, .. }
            | BattleEvent::Tick { system_id, .. }
            | BattleEvent::Reinforcements { system_id, .. }
            | BattleEvent::Concluded { system_id, .. } => *system_id,
        }
    }
}

/// Identity of one reinforcement unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinforcementInfo {
    pub id: UnitId,
    pub faction_id: FactionId,
    pub player_id: Option<PlayerId>,
}

/// Event queue for collecting events between broadcast drains
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<BattleEvent>,
}

impl EventQueue {
    /// Create a new empty event queue
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the queue
    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    /// Add many events to the queue
    pub fn extend(&mut self, events: impl IntoIterator<Item = BattleEvent>) {
        self.events.extend(events);
    }

    /// Get all events and clear the queue
    pub fn drain(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get the number of events in the queue
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue_push_and_drain() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());

        queue.push(BattleEvent::Started {
            battle_id: "b-1".to_string(),
            system_id: 42,
            unit_count: 10,
            factions: vec![1, 2],
        });
        assert_eq!(queue.len(), 1);

        let events = queue.drain();
        assert_eq!(events.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_started_event_serialization() {
        let event = BattleEvent::Started {
            battle_id: "b-1".to_string(),
            system_id: 42,
            unit_count: 10,
            factions: vec![1, 2],
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("battle:started"));
        assert!(json.contains("\"system_id\":42"));
    }

    #[test]
    fn test_tick_event_serialization() {
        let event = BattleEvent::Tick {
            battle_id: "b-1".to_string(),
            system_id: 42,
            tick: 7,
            moved: vec![],
            damaged: vec![UnitDamaged {
                id: 2,
                hp: 40.0,
                shield: 0.0,
                attacker_id: 1,
            }],
            destroyed: vec![],
            weapons_fired: vec![],
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("battle:tick"));
        assert!(json.contains("\"tick\":7"));
        assert!(json.contains("\"attacker_id\":1"));
    }

    #[test]
    fn test_concluded_event_serialization() {
        let event = BattleEvent::Concluded {
            battle_id: "b-1".to_string(),
            system_id: 42,
            duration_ms: 65_000,
            total_ticks: 1300,
            survivors: vec![1, 3],
            casualties: vec![2],
            victor: Some(1),
            reason: "combat_resolved".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("battle:concluded"));
        assert!(json.contains("combat_resolved"));
        assert!(json.contains("\"victor\":1"));
    }

    #[test]
    fn test_concluded_without_victor_serializes_null() {
        let event = BattleEvent::Concluded {
            battle_id: "b-1".to_string(),
            system_id: 42,
            duration_ms: 1000,
            total_ticks: 20,
            survivors: vec![],
            casualties: vec![],
            victor: None,
            reason: "stalemate_no_damage_5m".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"victor\":null"));
    }

    #[test]
    fn test_event_accessors() {
        let event = BattleEvent::Reinforcements {
            battle_id: "b-9".to_string(),
            system_id: 7,
            reinforcements: vec![ReinforcementInfo {
                id: 5,
                faction_id: 2,
                player_id: Some(11),
            }],
        };
        assert_eq!(event.battle_id(), "b-9");
        assert_eq!(event.system_id(), 7);
    }
}
