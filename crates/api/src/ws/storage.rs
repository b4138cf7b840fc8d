use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Tracks all active WebSocket connections by file ID and connection ID.
/// Each file can have multiple subscribers (several tabs watching the same
/// upload).
pub struct WsStorage {
    /// file_id -> (connection_id, sender) pairs for file-level broadcasts
    by_file: DashMap<String, Vec<(String, WsSender)>>,
    /// connection_id -> (file_id, sender) for connection-targeted sends
    connection_map: DashMap<String, (String, WsSender)>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            by_file: DashMap::new(),
            connection_map: DashMap::new(),
        }
    }

    pub fn add(&self, file_id: String, connection_id: String, sender: WsSender) {
        self.by_file
            .entry(file_id.clone())
            .or_default()
            .push((connection_id.clone(), sender.clone()));
        self.connection_map
            .insert(connection_id, (file_id, sender));
    }

    /// Drops a connection from both maps. Safe to call twice.
    pub fn remove(&self, connection_id: &str) {
        let Some((_, (file_id, _))) = self.connection_map.remove(connection_id) else {
            return;
        };
        if let Some(mut subscribers) = self.by_file.get_mut(&file_id) {
            subscribers.retain(|(cid, _)| cid != connection_id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.by_file.remove(&file_id);
            }
        }
    }

    /// All subscribers of a file, as (connection_id, sender) pairs.
    pub fn subscribers(&self, file_id: &str) -> Vec<(String, WsSender)> {
        self.by_file
            .get(file_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn sender_by_connection(&self, connection_id: &str) -> Option<WsSender> {
        self.connection_map
            .get(connection_id)
            .map(|entry| entry.value().1.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connection_map.len()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
