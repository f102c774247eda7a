use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Buffered outgoing messages per connection
pub const CLIENT_BUFFER: usize = 64;

/// Message pushed to a connected client
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl PushMessage {
    pub fn new(kind: &str, data: serde_json::Value) -> Self {
        Self { kind: kind.to_string(), data }
    }
}

struct ClientHandle {
    connection_id: Uuid,
    sender: mpsc::Sender<String>,
}

/// Registry of live websocket connections, one per user
#[derive(Default)]
pub struct NotificationHub {
    clients: DashMap<i64, ClientHandle>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user, replacing any previous one
    pub fn register(&self, user_id: i64, sender: mpsc::Sender<String>) -> Uuid {
        let connection_id = Uuid::new_v4();
        if self
            .clients
            .insert(user_id, ClientHandle { connection_id, sender })
            .is_some()
        {
            debug!("Replaced existing websocket connection for user {}", user_id);
        }
        connection_id
    }

    /// Remove a user's connection if it is still the given one
    pub fn remove(&self, user_id: i64, connection_id: Uuid) {
        self.clients
            .remove_if(&user_id, |_, handle| handle.connection_id == connection_id);
    }

    /// Push a message to a user. Returns whether it was queued.
    pub fn send_to_user(&self, user_id: i64, message: &PushMessage) -> bool {
        let payload = match serde_json::to_string(message) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize push message: {}", e);
                return false;
            }
        };

        let result = match self.clients.get(&user_id) {
            Some(handle) => handle.sender.try_send(payload),
            None => return false,
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Websocket buffer full for user {}, message dropped", user_id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Websocket for user {} is closed, dropping client", user_id);
                self.clients.remove_if(&user_id, |_, handle| handle.sender.is_closed());
                false
            }
        }
    }

    pub fn is_connected(&self, user_id: i64) -> bool {
        self.clients.contains_key(&user_id)
    }

    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }
}
