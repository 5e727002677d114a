//! Contains methods and definitions pertaining to the Broadside server.
//!
//! Wires the shared battle manager, the websocket manager, and the tick
//! scheduler into one Rocket instance and runs it to completion. On graceful
//! shutdown every live battle is concluded with reason `server_shutdown`
//! and the final events are broadcast before the process exits.

use std::net::IpAddr;
use std::sync::Arc;

use log::info;

use crate::api;
use crate::battle::manager::BattleManager;
use crate::battle::scheduler::TickScheduler;
use crate::config::ServerConfig;
use crate::websocket::WebSocketManager;

/// Starts the server and blocks until shutdown.
pub async fn launch(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let manager = BattleManager::new_shared(config.simulation.clone());
    let ws_manager = Arc::new(WebSocketManager::new());

    // The scheduler drives all battles for the life of the process.
    let scheduler = TickScheduler::new(manager.clone(), ws_manager.clone());
    tokio::spawn(scheduler.run());

    let address: IpAddr = config.http.address.parse()?;
    let figment = rocket::Config::figment()
        .merge(("address", address))
        .merge(("port", config.http.port));

    info!(
        "Listening on {}:{} (tick interval {} ms)",
        config.http.address, config.http.port, config.simulation.tick_interval_ms
    );

    let result = rocket::custom(figment)
        .manage(manager.clone())
        .manage(ws_manager.clone())
        .mount("/", api::routes())
        .launch()
        .await;

    // Conclude every live battle before the process exits.
    let events = {
        let mut manager = manager.write().unwrap();
        manager.shutdown();
        manager.drain_events()
    };
    for event in events {
        ws_manager.broadcast(event);
    }
    info!("Server stopped");

    result?;
    Ok(())
}
