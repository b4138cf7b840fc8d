use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::StreamExt;
use sawtfeel_models::{EmotionAnalysis, ProcessingStatus, Transcript};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use super::dispatcher;

/// Upgrade for `/ws/processing/{file_id}`: pipeline status streaming.
pub async fn processing_upgrade(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    if !file_exists(&state, &file_id).await {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    ws.on_upgrade(move |socket| handle_processing_socket(socket, state, file_id))
}

/// Upgrade for `/ws/playback/{file_id}`: cursor-driven transcript and
/// emotion synchronization.
pub async fn playback_upgrade(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    if !file_exists(&state, &file_id).await {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    ws.on_upgrade(move |socket| handle_playback_socket(socket, state, file_id))
}

async fn file_exists(state: &AppState, file_id: &str) -> bool {
    state.store.get(file_id).await.is_some() || state.pipeline.status(file_id).await.is_some()
}

async fn handle_processing_socket(socket: WebSocket, state: AppState, file_id: String) {
    let connection_id = Uuid::new_v4().to_string();
    info!(%file_id, %connection_id, "Processing WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));
    state
        .ws_storage
        .add(file_id.clone(), connection_id.clone(), sender);

    let connected = json!({
        "type": "connected",
        "file_id": file_id,
        "timestamp": Utc::now(),
    });
    dispatcher::send_to_connection(&state.ws_storage, &connection_id, &connected).await;

    // Initial status snapshot, falling back to the stored record.
    let record = state.pipeline.status(&file_id).await;
    let status = record
        .as_ref()
        .map(|r| r.status)
        .or(state.store.get(&file_id).await.map(|m| m.status))
        .unwrap_or(ProcessingStatus::Completed);
    let status_msg = json!({
        "type": "status_update",
        "file_id": file_id,
        "status": status,
        "progress": record.as_ref().map(|r| r.progress).unwrap_or(status.progress()),
        "message": format!("File is {status}"),
        "timestamp": Utc::now(),
    });
    dispatcher::send_to_connection(&state.ws_storage, &connection_id, &status_msg).await;

    if state.pipeline.is_running(&file_id) {
        spawn_progress_ticks(state.clone(), file_id.clone(), connection_id.clone());
    } else if status == ProcessingStatus::Completed {
        let done = json!({
            "type": "completed",
            "file_id": file_id,
            "message": "Processing completed successfully",
            "timestamp": Utc::now(),
        });
        dispatcher::send_to_connection(&state.ws_storage, &connection_id, &done).await;
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                    continue;
                };
                if parsed.get("type").and_then(|t| t.as_str()) == Some("ping") {
                    let pong = json!({ "type": "pong", "timestamp": Utc::now() });
                    dispatcher::send_to_connection(&state.ws_storage, &connection_id, &pong).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(%file_id, %connection_id, %e, "Processing WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.ws_storage.remove(&connection_id);
    info!(%file_id, %connection_id, "Processing WebSocket disconnected");
}

/// Per-connection progress feed: one `progress_update` per second while the
/// run is live, then a terminal `completed`/`error` message. Exits as soon
/// as the connection is gone.
fn spawn_progress_ticks(state: AppState, file_id: String, connection_id: String) {
    tokio::spawn(async move {
        loop {
            if state.ws_storage.sender_by_connection(&connection_id).is_none() {
                break;
            }
            let Some(record) = state.pipeline.status(&file_id).await else {
                break;
            };

            let msg = json!({
                "type": "progress_update",
                "file_id": file_id,
                "status": record.status,
                "progress": record.progress,
                "message": format!("Processing: {}", record.status),
                "timestamp": record.timestamp,
            });
            dispatcher::send_to_connection(&state.ws_storage, &connection_id, &msg).await;

            if record.status.is_terminal() {
                let (kind, message) = if record.status == ProcessingStatus::Completed {
                    ("completed", "Processing completed successfully".to_string())
                } else {
                    (
                        "error",
                        record
                            .error
                            .unwrap_or_else(|| "Processing failed".to_string()),
                    )
                };
                let terminal = json!({
                    "type": kind,
                    "file_id": file_id,
                    "message": message,
                    "timestamp": Utc::now(),
                });
                dispatcher::send_to_connection(&state.ws_storage, &connection_id, &terminal).await;
                break;
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        debug!(%file_id, %connection_id, "Progress tick task exited");
    });
}

async fn handle_playback_socket(socket: WebSocket, state: AppState, file_id: String) {
    let connection_id = Uuid::new_v4().to_string();
    let cursor = state.sessions.create(file_id.clone());
    let session_id = cursor.session_id.clone();
    info!(%file_id, %connection_id, %session_id, "Playback WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));
    state
        .ws_storage
        .add(file_id.clone(), connection_id.clone(), sender);

    let connected = json!({
        "type": "connected",
        "file_id": file_id,
        "session_id": session_id,
        "timestamp": Utc::now(),
    });
    dispatcher::send_to_connection(&state.ws_storage, &connection_id, &connected).await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_playback_message(&state, &file_id, &session_id, &connection_id, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(%file_id, %connection_id, %e, "Playback WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.ws_storage.remove(&connection_id);
    state.sessions.remove(&session_id);
    info!(%file_id, %connection_id, %session_id, "Playback WebSocket disconnected");
}

async fn handle_playback_message(
    state: &AppState,
    file_id: &str,
    session_id: &str,
    connection_id: &str,
    text: &str,
) {
    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return,
    };
    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    debug!(%file_id, %session_id, msg_type, "Playback message received");

    match msg_type {
        "time_update" => {
            let current_time = parsed
                .get("current_time")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let is_playing = parsed
                .get("is_playing")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            match state
                .sessions
                .update(session_id, current_time, is_playing, false)
            {
                Ok(_) => {
                    let echo = json!({
                        "type": "time_update",
                        "file_id": file_id,
                        "current_time": current_time,
                        "is_playing": is_playing,
                        "timestamp": Utc::now(),
                    });
                    dispatcher::broadcast_to_file(&state.ws_storage, file_id, &echo).await;

                    push_emotion_update(state, file_id, current_time).await;
                    push_transcript_update(state, file_id, current_time).await;
                }
                Err(e) => {
                    let error = json!({
                        "type": "error",
                        "message": e.to_string(),
                        "file_id": file_id,
                        "timestamp": Utc::now(),
                    });
                    dispatcher::send_to_connection(&state.ws_storage, connection_id, &error).await;
                }
            }
        }
        "play" | "pause" => {
            let playing = msg_type == "play";
            if let Some(cursor) = state.sessions.get(session_id) {
                let _ = state
                    .sessions
                    .update(session_id, cursor.current_time, playing, false);
            }
            let event = json!({
                "type": msg_type,
                "file_id": file_id,
                "timestamp": Utc::now(),
            });
            dispatcher::broadcast_to_file(&state.ws_storage, file_id, &event).await;
        }
        "seek" => {
            let time = parsed.get("time").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let playing = state
                .sessions
                .get(session_id)
                .map(|c| c.is_playing)
                .unwrap_or(false);
            match state.sessions.update(session_id, time, playing, true) {
                Ok(_) => {
                    let event = json!({
                        "type": "seek",
                        "file_id": file_id,
                        "time": time,
                        "timestamp": Utc::now(),
                    });
                    dispatcher::broadcast_to_file(&state.ws_storage, file_id, &event).await;
                }
                Err(e) => {
                    let error = json!({
                        "type": "error",
                        "message": e.to_string(),
                        "file_id": file_id,
                        "timestamp": Utc::now(),
                    });
                    dispatcher::send_to_connection(&state.ws_storage, connection_id, &error).await;
                }
            }
        }
        "ping" => {
            let pong = json!({ "type": "pong", "timestamp": Utc::now() });
            dispatcher::send_to_connection(&state.ws_storage, connection_id, &pong).await;
        }
        _ => {
            debug!(%file_id, msg_type, "Unknown playback message type");
        }
    }
}

/// Re-reads the cached analysis and pushes the segment covering the cursor,
/// if any. No segment covering the timestamp means no update this tick.
async fn push_emotion_update(state: &AppState, file_id: &str, current_time: f64) {
    let Some(analysis) = state
        .cache
        .get_as::<EmotionAnalysis>(file_id, "emotions")
        .await
    else {
        return;
    };
    let Some(segment) = analysis.segment_at(current_time) else {
        return;
    };

    let msg = json!({
        "type": "emotion_update",
        "file_id": file_id,
        "current_time": current_time,
        "emotion": segment.combined_emotion,
        "confidence": segment.combined_confidence,
        "textual_emotion": segment.textual_emotion,
        "tonal_emotion": segment.tonal_emotion,
        "timestamp": Utc::now(),
    });
    dispatcher::broadcast_to_file(&state.ws_storage, file_id, &msg).await;
}

/// Re-reads the cached transcript and pushes the word at the cursor, or the
/// most recently completed word when the cursor sits between words.
async fn push_transcript_update(state: &AppState, file_id: &str, current_time: f64) {
    let Some(transcript) = state
        .cache
        .get_as::<Transcript>(file_id, "transcript")
        .await
    else {
        return;
    };

    let (word_index, current_word) = match transcript.word_at(current_time) {
        Some((i, word)) => (i as i64, word.word.clone()),
        None => (-1, "...".to_string()),
    };

    let msg = json!({
        "type": "transcript_update",
        "file_id": file_id,
        "current_time": current_time,
        "current_word": current_word,
        "word_index": word_index,
        "timestamp": Utc::now(),
    });
    dispatcher::broadcast_to_file(&state.ws_storage, file_id, &msg).await;
}
