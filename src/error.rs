//! Battle-server error types.
//!
//! Operational errors are returned to the caller; per-tick failures end only
//! the affected battle. The scheduler itself never dies.

use std::fmt;

/// Errors surfaced by the battle manager and its control operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleError {
    /// Missing mandatory fields or malformed unit/weapon records.
    InvalidPayload(String),

    /// Operation targets an unknown or already-purged battle id.
    BattleNotFound(String),

    /// Mutation attempted on a battle that has already concluded.
    BattleEnded(String),

    /// A tick panicked; the offending battle was terminated.
    StepFailure(String),
}

impl fmt::Display for BattleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleError::InvalidPayload(detail) => write!(f, "invalid payload: {}", detail),
            BattleError::BattleNotFound(battle_id) => {
                write!(f, "battle '{}' not found", battle_id)
            }
            BattleError::BattleEnded(battle_id) => {
                write!(f, "battle '{}' has already ended", battle_id)
            }
            BattleError::StepFailure(battle_id) => {
                write!(f, "simulation step failed for battle '{}'", battle_id)
            }
        }
    }
}

impl std::error::Error for BattleError {}

/// Convenience alias for manager operations.
pub type BattleResult<T> = Result<T, BattleError>;
