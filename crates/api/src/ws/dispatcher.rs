use axum::extract::ws::Message;
use futures::SinkExt;
use tracing::{debug, warn};

use super::storage::WsStorage;

/// Broadcasts a JSON message to every subscriber of a file. Delivery is
/// best-effort: a failed send prunes that subscriber and the rest still
/// receive the message.
pub async fn broadcast_to_file(
    ws_storage: &WsStorage,
    file_id: &str,
    message: &serde_json::Value,
) {
    let text = serde_json::to_string(message).unwrap_or_default();

    let mut failed = Vec::new();
    for (connection_id, sender) in ws_storage.subscribers(file_id) {
        let mut guard = sender.lock().await;
        if let Err(e) = guard.send(Message::text(text.clone())).await {
            warn!(%file_id, %connection_id, %e, "Failed to deliver WS message, pruning subscriber");
            failed.push(connection_id);
        } else {
            debug!(%file_id, %connection_id, "WS message sent");
        }
    }

    for connection_id in failed {
        ws_storage.remove(&connection_id);
    }
}

/// Sends a JSON message to a single connection.
pub async fn send_to_connection(
    ws_storage: &WsStorage,
    connection_id: &str,
    message: &serde_json::Value,
) {
    if let Some(sender) = ws_storage.sender_by_connection(connection_id) {
        let text = serde_json::to_string(message).unwrap_or_default();
        let mut guard = sender.lock().await;
        if let Err(e) = guard.send(Message::text(text)).await {
            warn!(%connection_id, %e, "Failed to send WS message to connection");
        }
    }
}
