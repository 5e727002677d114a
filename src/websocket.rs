//! WebSocket support for real-time battle updates
//!
//! This module provides the WebSocket endpoint clients use to receive battle
//! event streams. Clients subscribe to solar systems or individual battles
//! and receive only the events scoped to their subscriptions.
//!
//! Publishing goes through a `tokio::sync::broadcast` channel: sends never
//! block, and a client that lags simply loses the oldest events. The tick
//! loop is never back-pressured by a slow consumer.

use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_ws::{Channel, Message, WebSocket};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::BattleEvent;
use crate::models::SystemId;

/// Capacity of the broadcast channel before laggards start losing events.
const BROADCAST_CAPACITY: usize = 1024;

/// WebSocket subscription request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionRequest {
    /// Subscribe to all battle events in a solar system
    SubscribeToSystem { system_id: SystemId },

    /// Subscribe to the events of one battle
    SubscribeToBattle { battle_id: String },

    /// Unsubscribe from a solar system
    UnsubscribeFromSystem { system_id: SystemId },

    /// Unsubscribe from a battle
    UnsubscribeFromBattle { battle_id: String },
}

/// WebSocket subscription response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionResponse {
    /// Subscription successful
    Subscribed { message: String },

    /// Unsubscribed successfully
    Unsubscribed { message: String },

    /// Error occurred
    Error { message: String },
}

/// Client subscription state
#[derive(Debug, Clone, Default)]
pub struct ClientSubscription {
    pub system_ids: Vec<SystemId>,
    pub battle_ids: Vec<String>,
}

/// WebSocket connection manager
pub struct WebSocketManager {
    /// Event broadcaster
    event_tx: broadcast::Sender<BattleEvent>,

    /// Connected clients and their subscriptions
    clients: Arc<RwLock<HashMap<String, ClientSubscription>>>,
}

impl WebSocketManager {
    /// Create a new WebSocket manager
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            event_tx,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get a new event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<BattleEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all subscribed clients. Never blocks; the send
    /// result is ignored because zero receivers is not an error.
    pub fn broadcast(&self, event: BattleEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Register a new client
    pub fn register_client(&self, client_id: String) {
        let mut clients = self.clients.write().unwrap();
        clients.insert(client_id, ClientSubscription::default());
    }

    /// Unregister a client
    pub fn unregister_client(&self, client_id: &str) {
        let mut clients = self.clients.write().unwrap();
        clients.remove(client_id);
    }

    /// Update client subscription
    pub fn update_subscription(&self, client_id: &str, subscription: ClientSubscription) {
        let mut clients = self.clients.write().unwrap();
        clients.insert(client_id.to_string(), subscription);
    }

    /// Get client subscription
    pub fn get_subscription(&self, client_id: &str) -> Option<ClientSubscription> {
        let clients = self.clients.read().unwrap();
        clients.get(client_id).cloned()
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    /// Check if a client should receive an event
    pub fn should_receive_event(&self, client_id: &str, event: &BattleEvent) -> bool {
        let subscription = match self.get_subscription(client_id) {
            Some(sub) => sub,
            None => return false,
        };

        subscription.system_ids.contains(&event.system_id())
            || subscription
                .battle_ids
                .iter()
                .any(|id| id == event.battle_id())
    }
}

impl Default for WebSocketManager {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket endpoint handler
#[get("/ws")]
pub fn ws_handler(ws: WebSocket, ws_manager: &State<Arc<WebSocketManager>>) -> Channel<'static> {
    let client_id = Uuid::new_v4().to_string();
    let ws_manager = ws_manager.inner().clone();

    ws.channel(move |stream| {
        Box::pin(async move {
            use futures::{SinkExt, StreamExt};

            // Register client
            ws_manager.register_client(client_id.clone());

            // Subscribe to events
            let mut event_rx = ws_manager.subscribe();

            // Client subscription state
            let mut subscription = ClientSubscription::default();

            // Split stream for reading and writing
            let (mut sink, mut stream) = stream.split();

            loop {
                tokio::select! {
                    // Handle incoming messages from client
                    message = stream.next() => {
                        match message {
                            Some(Ok(msg)) => {
                                if let Message::Text(text) = msg {
                                    let response = match serde_json::from_str::<SubscriptionRequest>(&text) {
                                        Ok(request) => handle_subscription_request(request, &mut subscription),
                                        Err(e) => SubscriptionResponse::Error {
                                            message: format!("Invalid subscription request: {}", e),
                                        },
                                    };

                                    // Update subscription in manager
                                    ws_manager.update_subscription(&client_id, subscription.clone());

                                    // Send response
                                    let response_json = serde_json::to_string(&response).unwrap();
                                    if sink.send(Message::Text(response_json)).await.is_err() {
                                        break;
                                    }
                                } else if msg.is_close() {
                                    break;
                                }
                            }
                            Some(Err(_)) | None => break,
                        }
                    }

                    // Handle events from broadcast channel
                    event = event_rx.recv() => {
                        match event {
                            Ok(battle_event) => {
                                // Check if client should receive this event
                                if ws_manager.should_receive_event(&client_id, &battle_event) {
                                    let event_json = serde_json::to_string(&battle_event).unwrap();
                                    if sink.send(Message::Text(event_json)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => {
                                // Client lagged behind, send error
                                let error = SubscriptionResponse::Error {
                                    message: "Event stream lagged, some events may have been missed".to_string(),
                                };
                                let error_json = serde_json::to_string(&error).unwrap();
                                let _ = sink.send(Message::Text(error_json)).await;
                            }
                            Err(_) => break,
                        }
                    }
                }
            }

            // Unregister client
            ws_manager.unregister_client(&client_id);

            Ok(())
        })
    })
}

/// Handle a subscription request
fn handle_subscription_request(
    request: SubscriptionRequest,
    subscription: &mut ClientSubscription,
) -> SubscriptionResponse {
    match request {
        SubscriptionRequest::SubscribeToSystem { system_id } => {
            if !subscription.system_ids.contains(&system_id) {
                subscription.system_ids.push(system_id);
            }
            SubscriptionResponse::Subscribed {
                message: format!("Subscribed to system {}", system_id),
            }
        }

        SubscriptionRequest::SubscribeToBattle { battle_id } => {
            if !subscription.battle_ids.contains(&battle_id) {
                subscription.battle_ids.push(battle_id.clone());
            }
            SubscriptionResponse::Subscribed {
                message: format!("Subscribed to battle {}", battle_id),
            }
        }

        SubscriptionRequest::UnsubscribeFromSystem { system_id } => {
            subscription.system_ids.retain(|id| *id != system_id);
            SubscriptionResponse::Unsubscribed {
                message: format!("Unsubscribed from system {}", system_id),
            }
        }

        SubscriptionRequest::UnsubscribeFromBattle { battle_id } => {
            subscription.battle_ids.retain(|id| *id != battle_id);
            SubscriptionResponse::Unsubscribed {
                message: format!("Unsubscribed from battle {}", battle_id),
            }
        }
    }
}

/// Get WebSocket connection info
#[derive(Debug, Serialize)]
pub struct WebSocketInfo {
    pub endpoint: String,
    pub connected_clients: usize,
}

/// Get WebSocket info endpoint
#[get("/ws/info")]
pub fn ws_info(ws_manager: &State<Arc<WebSocketManager>>) -> Json<WebSocketInfo> {
    Json(WebSocketInfo {
        endpoint: "/ws".to_string(),
        connected_clients: ws_manager.client_count(),
    })
}
