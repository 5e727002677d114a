//! Weapon models and firing math
//!
//! A weapon resolves logically at fire time — there is no server-side
//! projectile travel. Clients receive a precomputed impact time derived from
//! the weapon's tag so visualizers know when the hit should appear to land.

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Travel speed of guided missiles, in spatial units per second.
const MISSILE_SPEED: f64 = 300.0;

/// Travel speed of torpedoes, in spatial units per second.
const TORPEDO_SPEED: f64 = 150.0;

/// Travel speed assumed for any other non-instantaneous projectile.
const DEFAULT_PROJECTILE_SPEED: f64 = 800.0;

/// Ingress schema for a weapon definition.
///
/// `cooldown` and `last_fired` are optional on the wire: a missing cooldown is
/// derived from `fire_rate`, and a zero `last_fired` marks a freshly-loaded
/// weapon whose first discharge gets staggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponRecord {
    /// String key used for projectile-speed lookup ("laser", "missile", ...).
    pub tag: String,
    /// Damage per second at full firing cadence.
    pub dps: f64,
    /// Discharges per second.
    pub fire_rate: f64,
    /// Maximum distance at which this weapon can hit at all.
    pub max_range: f64,
    /// Distance its owner tries to hold against a target.
    #[serde(default)]
    pub optimal_range: f64,
    /// Heaviest armor this weapon can damage.
    #[serde(default)]
    pub target_armor_max: f64,
    /// Seconds between shots. Derived as `1 / fire_rate` when absent.
    #[serde(default)]
    pub cooldown: Option<f64>,
    /// Wall-time stamp of the last discharge (seconds).
    #[serde(default)]
    pub last_fired: f64,
}

/// A firing capability owned by a unit.
#[derive(Debug, Clone)]
pub struct Weapon {
    pub tag: String,
    pub dps: f64,
    pub fire_rate: f64,
    pub max_range: f64,
    pub optimal_range: f64,
    pub target_armor_max: f64,
    pub cooldown: f64,
    pub last_fired: f64,
}

impl Weapon {
    /// Build a weapon from its ingress record, deriving the cooldown from the
    /// fire rate when the record does not carry one.
    pub fn from_record(record: WeaponRecord) -> Self {
        let cooldown = match record.cooldown {
            Some(c) if c > 0.0 => c,
            _ if record.fire_rate > 0.0 => 1.0 / record.fire_rate,
            _ => 0.0,
        };

        Self {
            tag: record.tag,
            dps: record.dps,
            fire_rate: record.fire_rate,
            max_range: record.max_range,
            optimal_range: record.optimal_range,
            target_armor_max: record.target_armor_max,
            cooldown,
            last_fired: record.last_fired,
        }
    }

    /// Convert back into the wire representation.
    pub fn to_record(&self) -> WeaponRecord {
        WeaponRecord {
            tag: self.tag.clone(),
            dps: self.dps,
            fire_rate: self.fire_rate,
            max_range: self.max_range,
            optimal_range: self.optimal_range,
            target_armor_max: self.target_armor_max,
            cooldown: Some(self.cooldown),
            last_fired: self.last_fired,
        }
    }

    /// True when the cooldown has fully elapsed at `now`.
    pub fn is_ready(&self, now: f64) -> bool {
        self.cooldown > 0.0 && now - self.last_fired >= self.cooldown
    }

    /// Wall time at which this weapon next comes off cooldown.
    pub fn ready_at(&self) -> f64 {
        self.last_fired + self.cooldown
    }

    /// Damage delivered by a single discharge (`dps × cooldown`).
    pub fn damage_per_shot(&self) -> f64 {
        self.dps * self.cooldown
    }

    /// True when this weapon is allowed to damage a target with the given
    /// armor rating. Armor gates damage eligibility; it never reduces damage.
    pub fn can_damage(&self, armor: f64) -> bool {
        self.target_armor_max >= armor
    }

    /// Milliseconds a visualizer should wait before showing the hit land,
    /// based on the weapon's tag category and the distance to the target.
    pub fn impact_time_ms(&self, distance: f64) -> f64 {
        let tag = self.tag.to_ascii_lowercase();
        if tag.contains("laser") || tag.contains("beam") {
            0.0
        } else if tag.contains("missile") {
            distance / MISSILE_SPEED * 1000.0
        } else if tag.contains("torpedo") {
            distance / TORPEDO_SPEED * 1000.0
        } else {
            distance / DEFAULT_PROJECTILE_SPEED * 1000.0
        }
    }

    /// Randomize the first discharge of a freshly-loaded weapon so a fleet
    /// entering battle does not fire in synchronized volleys.
    ///
    /// Only applies to weapons whose `last_fired` is the zero sentinel.
    pub fn stagger_initial_cooldown(&mut self, now: f64, rng: &mut StdRng) {
        if self.last_fired == 0.0 && self.cooldown > 0.0 {
            // Draw in (0, 1] so last_fired lands in [now - cooldown, now).
            let r = 1.0 - rng.random::<f64>();
            self.last_fired = now - r * self.cooldown;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn record(tag: &str) -> WeaponRecord {
        WeaponRecord {
            tag: tag.to_string(),
            dps: 10.0,
            fire_rate: 2.0,
            max_range: 100.0,
            optimal_range: 50.0,
            target_armor_max: 5.0,
            cooldown: None,
            last_fired: 0.0,
        }
    }

    #[test]
    fn cooldown_derived_from_fire_rate() {
        let weapon = Weapon::from_record(record("laser"));
        assert!((weapon.cooldown - 0.5).abs() < 1e-9);
        assert!((weapon.damage_per_shot() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_cooldown_wins_over_fire_rate() {
        let mut rec = record("laser");
        rec.cooldown = Some(2.0);
        let weapon = Weapon::from_record(rec);
        assert_eq!(weapon.cooldown, 2.0);
    }

    #[test]
    fn ready_check_respects_cooldown() {
        let mut weapon = Weapon::from_record(record("laser"));
        weapon.last_fired = 10.0;
        assert!(!weapon.is_ready(10.2));
        assert!(weapon.is_ready(10.5));
        assert!(weapon.is_ready(11.0));
    }

    #[test]
    fn zero_fire_rate_never_ready() {
        let mut rec = record("laser");
        rec.fire_rate = 0.0;
        let weapon = Weapon::from_record(rec);
        assert_eq!(weapon.cooldown, 0.0);
        assert!(!weapon.is_ready(1_000_000.0));
    }

    #[test]
    fn impact_time_by_category() {
        let laser = Weapon::from_record(record("laser"));
        let beam = Weapon::from_record(record("heavy_beam"));
        let missile = Weapon::from_record(record("missile_launcher"));
        let torpedo = Weapon::from_record(record("torpedo_tube"));
        let kinetic = Weapon::from_record(record("railgun"));

        assert_eq!(laser.impact_time_ms(600.0), 0.0);
        assert_eq!(beam.impact_time_ms(600.0), 0.0);
        assert!((missile.impact_time_ms(600.0) - 2000.0).abs() < 1e-9);
        assert!((torpedo.impact_time_ms(600.0) - 4000.0).abs() < 1e-9);
        assert!((kinetic.impact_time_ms(600.0) - 750.0).abs() < 1e-9);
    }

    #[test]
    fn stagger_lands_inside_one_cooldown_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = 100.0;
        for _ in 0..256 {
            let mut weapon = Weapon::from_record(record("laser"));
            weapon.stagger_initial_cooldown(now, &mut rng);
            assert!(weapon.last_fired >= now - weapon.cooldown);
            assert!(weapon.last_fired < now);
        }
    }

    #[test]
    fn stagger_leaves_explicit_timestamps_alone() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rec = record("laser");
        rec.last_fired = -1.0;
        let mut weapon = Weapon::from_record(rec);
        weapon.stagger_initial_cooldown(0.0, &mut rng);
        assert_eq!(weapon.last_fired, -1.0);
    }
}
