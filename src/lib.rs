//! BROADSIDE Library
//!
//! Core library for the BROADSIDE space battle simulation server.
//! Provides the deterministic per-tick battle simulator, the battle manager
//! and scheduler, the REST control surface, and the websocket event stream.

pub mod api;
pub mod battle;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod server;
pub mod simulation;
pub mod websocket;

// Re-export commonly used items
pub use battle::manager::{BattleManager, SharedBattleManager};
pub use config::ServerConfig;
pub use simulation::Simulator;
