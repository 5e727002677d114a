//! Core combat entity models
//!
//! Defines the unit and weapon types owned by a battle simulator, along with
//! the ingress record schemas used to load them from callers.

pub mod unit;
pub mod weapon;

// Re-export commonly used items
pub use unit::{DamageOutcome, PositionUpdate, Unit, UnitRecord};
pub use weapon::{Weapon, WeaponRecord};

/// External identifier of a unit. Assigned by the caller, unique per battle.
pub type UnitId = u64;

/// Opaque scalar identifying a side. Two units are enemies iff their factions
/// differ.
pub type FactionId = u32;

/// Identifier of the player owning a unit, when one exists.
pub type PlayerId = u64;

/// External scope key (a solar system id) under which a battle's broadcasts
/// are published.
pub type SystemId = u64;
