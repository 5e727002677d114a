//! Per-tick delta records streamed to subscribers.

use serde::{Deserialize, Serialize};

use crate::models::UnitId;

/// A unit whose position changed this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMoved {
    pub id: UnitId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A unit that took damage this tick. `hp`/`shield` are captured at the
/// moment of the last hit, before end-of-tick shield regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDamaged {
    pub id: UnitId,
    pub hp: f64,
    pub shield: f64,
    /// The last unit to damage this one during the tick.
    pub attacker_id: UnitId,
}

/// A unit destroyed this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDestroyed {
    pub id: UnitId,
    pub destroyed_by: UnitId,
}

/// A weapon discharge. `impact_time_ms` tells visualizers when the logically
/// instant hit should appear to land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponFired {
    pub attacker_id: UnitId,
    pub target_id: UnitId,
    pub weapon_tag: String,
    pub impact_time_ms: f64,
}

/// Everything one `step` call produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickDelta {
    pub moved: Vec<UnitMoved>,
    pub damaged: Vec<UnitDamaged>,
    pub destroyed: Vec<UnitDestroyed>,
    pub weapons_fired: Vec<WeaponFired>,
    /// True when the tick produced no activity and nothing can happen before
    /// a future weapon-ready time or an external mutation.
    pub is_idle: bool,
}

impl TickDelta {
    /// True when the tick produced no observable activity.
    pub fn is_quiet(&self) -> bool {
        self.moved.is_empty()
            && self.damaged.is_empty()
            && self.destroyed.is_empty()
            && self.weapons_fired.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delta_is_quiet() {
        let delta = TickDelta::default();
        assert!(delta.is_quiet());
        assert!(!delta.is_idle);
    }

    #[test]
    fn any_activity_makes_delta_loud() {
        let mut delta = TickDelta::default();
        delta.weapons_fired.push(WeaponFired {
            attacker_id: 1,
            target_id: 2,
            weapon_tag: "laser".to_string(),
            impact_time_ms: 0.0,
        });
        assert!(!delta.is_quiet());
    }

    #[test]
    fn delta_serializes_with_field_names() {
        let mut delta = TickDelta::default();
        delta.damaged.push(UnitDamaged {
            id: 2,
            hp: 40.0,
            shield: 0.0,
            attacker_id: 1,
        });
        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.contains("\"damaged\""));
        assert!(json.contains("\"attacker_id\":1"));
    }
}
