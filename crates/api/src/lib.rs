pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use chrono::Utc;
use serde_json::json;
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Upload routes (100 MB body limit plus multipart overhead)
    let upload_routes = Router::new()
        .route("/upload", post(routes::upload::upload))
        .route("/upload/files", get(routes::upload::list_files))
        .route("/upload/{file_id}/status", get(routes::upload::status))
        .route("/upload/{file_id}", delete(routes::upload::delete))
        .layer(DefaultBodyLimit::max(110 * 1024 * 1024));

    // Processed-artifact routes
    let processing_routes = Router::new()
        .route(
            "/processing/{file_id}/transcript",
            get(routes::processing::transcript),
        )
        .route(
            "/processing/{file_id}/emotions",
            get(routes::processing::emotions),
        );

    let api = Router::new().merge(upload_routes).merge(processing_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws/processing/{file_id}", get(ws::handler::processing_upgrade))
        .route("/ws/playback/{file_id}", get(ws::handler::playback_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Spawns the long-lived background tasks: the pipeline-event fan-out to
/// WebSocket subscribers, the cache/upload retention sweep, and the idle
/// playback-session sweep.
pub fn spawn_background_tasks(state: &AppState) {
    spawn_status_fanout(state.clone());
    spawn_retention_sweep(state.clone());
    spawn_session_sweep(state.clone());
}

fn spawn_status_fanout(state: AppState) {
    let mut rx = state.pipeline.subscribe();
    tokio::spawn(async move {
        info!("Pipeline status fan-out task started");
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Status fan-out lagged behind pipeline events");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            let msg = json!({
                "type": "status_update",
                "file_id": event.file_id,
                "status": event.status,
                "progress": event.progress,
                "message": format!("File is {}", event.status),
                "timestamp": event.timestamp,
            });
            ws::dispatcher::broadcast_to_file(&state.ws_storage, &event.file_id, &msg).await;

            if event.status.is_terminal() {
                let (kind, message) = if event.status == sawtfeel_models::ProcessingStatus::Completed
                {
                    ("completed", "Processing completed successfully".to_string())
                } else {
                    (
                        "error",
                        event.error.unwrap_or_else(|| "Processing failed".to_string()),
                    )
                };
                let terminal = json!({
                    "type": kind,
                    "file_id": event.file_id,
                    "message": message,
                    "timestamp": Utc::now(),
                });
                ws::dispatcher::broadcast_to_file(&state.ws_storage, &event.file_id, &terminal)
                    .await;
            }
        }
        info!("Pipeline status fan-out task exited");
    });
}

fn spawn_retention_sweep(state: AppState) {
    let interval_secs = state.settings.storage.sweep_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.tick().await; // immediate first tick
        loop {
            interval.tick().await;

            let removed = state.store.remove_expired().await;
            for file_id in &removed {
                state.cache.remove_all(file_id).await;
            }

            let known = state.store.known_ids().await;
            let stats = state.cache.sweep(&known).await;
            if stats.removed_count > 0 || !removed.is_empty() {
                info!(
                    expired_uploads = removed.len(),
                    cache_entries = stats.removed_count,
                    bytes_freed = stats.bytes_freed,
                    "Retention sweep completed"
                );
            }
        }
    });
}

fn spawn_session_sweep(state: AppState) {
    let interval_secs = state.settings.realtime.session_sweep_interval_secs.max(1);
    let idle = chrono::Duration::seconds(state.settings.realtime.session_idle_timeout_secs as i64);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.tick().await;
        loop {
            interval.tick().await;
            state.sessions.sweep_idle(idle);
        }
    });
}
