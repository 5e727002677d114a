//! Tick scheduler service
//!
//! This module provides the background task that drives all battles: every
//! period it advances the battles that are due, then drains the manager's
//! pending events and broadcasts them to websocket clients.
//!
//! Broadcasting happens after the manager lock is released, so a slow
//! subscriber can never stretch a tick.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time;

use crate::websocket::WebSocketManager;

use super::manager::SharedBattleManager;

/// Scheduler service driving every battle at a fixed period
pub struct TickScheduler {
    manager: SharedBattleManager,
    ws_manager: Arc<WebSocketManager>,
    interval: Duration,
}

impl TickScheduler {
    /// Create a scheduler using the manager's configured tick interval
    pub fn new(manager: SharedBattleManager, ws_manager: Arc<WebSocketManager>) -> Self {
        let interval = {
            let manager = manager.read().unwrap();
            Duration::from_millis(manager.settings().tick_interval_ms)
        };
        Self {
            manager,
            ws_manager,
            interval,
        }
    }

    /// Create with a custom period
    pub fn with_interval(
        manager: SharedBattleManager,
        ws_manager: Arc<WebSocketManager>,
        interval: Duration,
    ) -> Self {
        Self {
            manager,
            ws_manager,
            interval,
        }
    }

    /// Run the scheduler forever.
    pub async fn run(self) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.fire();
        }
    }

    /// Run for a limited number of periods (useful for testing)
    pub async fn run_limited(self, iterations: usize) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        for _ in 0..iterations {
            interval.tick().await;
            self.fire();
        }
    }

    /// One scheduler firing: advance battles, then broadcast outside the lock.
    fn fire(&self) {
        let events = {
            let mut manager = self.manager.write().unwrap();
            manager.tick_all();
            manager.drain_events()
        };

        if !events.is_empty() {
            debug!("Broadcasting {} battle events", events.len());
        }
        for event in events {
            self.ws_manager.broadcast(event);
        }
    }
}
