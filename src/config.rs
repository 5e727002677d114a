//! Configuration module
//!
//! Handles loading the server configuration from a YAML file. Every knob has
//! a default, so a missing file or a partial file is never fatal: the server
//! runs with standard tuning unless told otherwise.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address
    #[serde(default = "default_address")]
    pub address: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Tuning knobs for the battle scheduler and simulators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Scheduler period in milliseconds (20 Hz)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How often an idle battle re-evaluates itself, in milliseconds
    #[serde(default = "default_idle_check_ms")]
    pub idle_check_ms: u64,
    /// Seconds between timeout evaluations per battle
    #[serde(default = "default_timeout_check_secs")]
    pub timeout_check_secs: f64,
    /// Absolute maximum battle duration in seconds
    #[serde(default = "default_max_battle_secs")]
    pub max_battle_secs: f64,
    /// Seconds without damage before a battle is declared a stalemate
    #[serde(default = "default_stalemate_secs")]
    pub stalemate_secs: f64,
    /// Seconds an ended battle stays queryable before it is purged
    #[serde(default = "default_retention_secs")]
    pub retention_secs: f64,
    /// Edge length of a spatial grid cell
    #[serde(default = "default_grid_cell_size")]
    pub grid_cell_size: f64,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_idle_check_ms() -> u64 {
    500
}

fn default_timeout_check_secs() -> f64 {
    10.0
}

fn default_max_battle_secs() -> f64 {
    30.0 * 60.0
}

fn default_stalemate_secs() -> f64 {
    5.0 * 60.0
}

fn default_retention_secs() -> f64 {
    60.0
}

fn default_grid_cell_size() -> f64 {
    500.0
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            idle_check_ms: default_idle_check_ms(),
            timeout_check_secs: default_timeout_check_secs(),
            max_battle_secs: default_max_battle_secs(),
            stalemate_secs: default_stalemate_secs(),
            retention_secs: default_retention_secs(),
            grid_cell_size: default_grid_cell_size(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from a file when one is given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load_from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Failed to load configuration from {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}
