//! BROADSIDE Space Battle Simulation Server
//!
//! This is the main entry point for the BROADSIDE server.
//! It provides a REST control surface and a websocket event stream for
//! battle subscribers.

use broadside::config::ServerConfig;
use broadside::server;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;

/// BROADSIDE - Space Battle Simulation Server
#[derive(Parser, Debug)]
#[command(name = "broadside")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the BROADSIDE server
    Start {
        /// Path to the server configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log level (error, warn, info, debug, trace)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config, log_level } => {
            // Initialize logging
            let level_filter = match log_level.to_lowercase().as_str() {
                "error" => LevelFilter::Error,
                "warn" => LevelFilter::Warn,
                "info" => LevelFilter::Info,
                "debug" => LevelFilter::Debug,
                "trace" => LevelFilter::Trace,
                _ => {
                    eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
                    LevelFilter::Info
                }
            };

            env_logger::Builder::new()
                .filter_level(level_filter)
                .init();

            info!("Starting BROADSIDE server");

            let config = ServerConfig::load_or_default(config.as_deref());

            server::launch(config).await?;

            Ok(())
        }
    }
}
