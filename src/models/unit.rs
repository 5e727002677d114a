//! Combat units and ingress normalization
//!
//! Units arrive as externally-supplied records and are normalized before they
//! participate in simulation: classification flags and weapon ranges are
//! derived, initial weapon cooldowns are staggered, and vitals are clamped
//! into their invariant ranges.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::weapon::{Weapon, WeaponRecord};
use super::{FactionId, PlayerId, UnitId};

/// Label keywords that classify a unit as a stationary installation.
const STATION_KEYWORDS: [&str; 3] = ["station", "outpost", "platform"];

/// Ingress schema for a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: UnitId,
    pub faction_id: FactionId,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub is_ship: Option<bool>,
    #[serde(default)]
    pub is_station: Option<bool>,
    pub max_hp: f64,
    pub hp: f64,
    #[serde(default)]
    pub max_shield: f64,
    #[serde(default)]
    pub shield: f64,
    #[serde(default)]
    pub armor: f64,
    #[serde(default)]
    pub shield_regen: f64,
    #[serde(default)]
    pub pos_x: f64,
    #[serde(default)]
    pub pos_y: f64,
    #[serde(default)]
    pub pos_z: f64,
    #[serde(default)]
    pub vel_x: f64,
    #[serde(default)]
    pub vel_y: f64,
    #[serde(default)]
    pub vel_z: f64,
    #[serde(default)]
    pub max_speed: f64,
    #[serde(default)]
    pub weapons: Vec<WeaponRecord>,
    #[serde(default)]
    pub max_weapon_range: f64,
    #[serde(default)]
    pub target_id: Option<UnitId>,
    #[serde(default)]
    pub alive: Option<bool>,
    #[serde(default)]
    pub damage_dealt: f64,
    #[serde(default)]
    pub damage_taken: f64,
}

/// A single position override delivered by an external caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: UnitId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Also drop the unit's current target so it reacquires next tick.
    #[serde(default)]
    pub clear_target: bool,
}

/// Result of applying one discharge of damage to a unit.
#[derive(Debug, Clone, Copy)]
pub struct DamageOutcome {
    /// Damage actually absorbed by shield plus hull.
    pub dealt: f64,
    /// True when this hit reduced the hull to zero.
    pub destroyed: bool,
}

/// A combat entity owned by one battle simulator.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub faction_id: FactionId,
    pub player_id: Option<PlayerId>,
    pub unit_type: String,
    pub is_ship: bool,
    pub is_station: bool,
    pub hp: f64,
    pub max_hp: f64,
    pub shield: f64,
    pub max_shield: f64,
    pub armor: f64,
    pub shield_regen: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub max_speed: f64,
    pub weapons: Vec<Weapon>,
    pub has_weapons: bool,
    pub max_weapon_range: f64,
    pub target_id: Option<UnitId>,
    pub alive: bool,
    pub damage_dealt: f64,
    pub damage_taken: f64,
}

impl Unit {
    /// Build a unit from its ingress record and normalize it.
    pub fn from_record(record: UnitRecord, now: f64, rng: &mut StdRng) -> Self {
        let weapons = record.weapons.into_iter().map(Weapon::from_record).collect();

        let mut unit = Self {
            id: record.id,
            faction_id: record.faction_id,
            player_id: record.player_id,
            unit_type: record.unit_type,
            is_ship: record.is_ship.unwrap_or(false),
            is_station: record.is_station.unwrap_or(false),
            hp: record.hp,
            max_hp: record.max_hp,
            shield: record.shield,
            max_shield: record.max_shield,
            armor: record.armor,
            shield_regen: record.shield_regen,
            position: Vector3::new(record.pos_x, record.pos_y, record.pos_z),
            velocity: Vector3::new(record.vel_x, record.vel_y, record.vel_z),
            max_speed: record.max_speed,
            weapons,
            has_weapons: false,
            max_weapon_range: record.max_weapon_range,
            target_id: record.target_id,
            alive: true,
            damage_dealt: record.damage_dealt,
            damage_taken: record.damage_taken,
        };
        unit.normalize(now, rng);
        unit
    }

    /// Make the unit internally consistent before it participates in
    /// simulation. Total and idempotent: re-running it changes nothing.
    ///
    /// Derives `has_weapons` and `max_weapon_range`, resolves the
    /// ship/station classification, staggers freshly-loaded weapon cooldowns,
    /// clamps vitals into their invariant ranges, and initializes `alive`.
    pub fn normalize(&mut self, now: f64, rng: &mut StdRng) {
        if !self.weapons.is_empty() {
            self.has_weapons = true;
        }
        if self.max_weapon_range <= 0.0 {
            self.max_weapon_range = self
                .weapons
                .iter()
                .map(|w| w.max_range)
                .fold(0.0, f64::max);
        }

        // Both flags set, or neither: fall back to the label. Ambiguous
        // labels default to ship.
        if self.is_ship == self.is_station {
            let label = self.unit_type.to_ascii_lowercase();
            self.is_station = STATION_KEYWORDS.iter().any(|k| label.contains(k));
            self.is_ship = !self.is_station;
        }

        for weapon in &mut self.weapons {
            weapon.stagger_initial_cooldown(now, rng);
        }

        self.max_hp = self.max_hp.max(0.0);
        self.hp = self.hp.clamp(0.0, self.max_hp);
        self.max_shield = self.max_shield.max(0.0);
        self.shield = self.shield.clamp(0.0, self.max_shield);
        self.armor = self.armor.max(0.0);
        self.alive = self.hp > 0.0;
    }

    /// Largest optimal range across the unit's weapons, 0 when unarmed.
    pub fn optimal_range(&self) -> f64 {
        self.weapons
            .iter()
            .map(|w| w.optimal_range)
            .fold(0.0, f64::max)
    }

    /// True when at least one weapon may damage a target with this armor.
    pub fn can_damage(&self, armor: f64) -> bool {
        self.weapons.iter().any(|w| w.can_damage(armor))
    }

    /// Earliest time any of this unit's weapons comes off cooldown.
    pub fn next_ready_time(&self) -> Option<f64> {
        self.weapons
            .iter()
            .filter(|w| w.cooldown > 0.0)
            .map(|w| w.ready_at())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Euclidean distance to another unit.
    pub fn distance_to(&self, other: &Unit) -> f64 {
        (other.position - self.position).norm()
    }

    /// Apply one discharge of damage, shield first, remainder to hull.
    ///
    /// Hull and shield are clamped at zero; a unit whose hull reaches zero is
    /// marked dead and never resurrects within the battle.
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        if !self.alive || amount <= 0.0 {
            return DamageOutcome {
                dealt: 0.0,
                destroyed: false,
            };
        }

        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        let hull = (amount - absorbed).min(self.hp);
        self.hp -= hull;

        let destroyed = self.hp <= 0.0;
        if destroyed {
            self.alive = false;
            self.hp = 0.0;
        }
        self.damage_taken += absorbed + hull;

        DamageOutcome {
            dealt: absorbed + hull,
            destroyed,
        }
    }

    /// Regenerate shield for `dt` seconds. Dead units do not regenerate.
    pub fn regenerate_shield(&mut self, dt: f64) {
        if self.alive && self.shield_regen > 0.0 {
            self.shield = (self.shield + self.shield_regen * dt).min(self.max_shield);
        }
    }

    /// Snapshot the unit back into its wire representation.
    pub fn to_record(&self) -> UnitRecord {
        UnitRecord {
            id: self.id,
            faction_id: self.faction_id,
            player_id: self.player_id,
            unit_type: self.unit_type.clone(),
            is_ship: Some(self.is_ship),
            is_station: Some(self.is_station),
            max_hp: self.max_hp,
            hp: self.hp,
            max_shield: self.max_shield,
            shield: self.shield,
            armor: self.armor,
            shield_regen: self.shield_regen,
            pos_x: self.position.x,
            pos_y: self.position.y,
            pos_z: self.position.z,
            vel_x: self.velocity.x,
            vel_y: self.velocity.y,
            vel_z: self.velocity.z,
            max_speed: self.max_speed,
            weapons: self.weapons.iter().map(Weapon::to_record).collect(),
            max_weapon_range: self.max_weapon_range,
            target_id: self.target_id,
            alive: Some(self.alive),
            damage_dealt: self.damage_dealt,
            damage_taken: self.damage_taken,
        }
    }
}
