use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use chrono::Utc;
use sawtfeel_analysis::audio::ffmpeg;
use sawtfeel_models::{FileKind, ProcessingStatus, detect_format};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{error::ApiError, state::AppState};

/// `POST /api/upload` — multipart upload, validation, and pipeline kick-off.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut filename: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }
        filename = field.file_name().map(str::to_string);
        content = Some(
            field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
                .to_vec(),
        );
        break;
    }

    let filename = filename.ok_or_else(|| ApiError::BadRequest("No filename provided".to_string()))?;
    let content = content.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let (file_type, format) = detect_format(&filename)
        .map_err(|e| ApiError::UnsupportedFormat(e.to_string()))?;

    let max_size = state.settings.limits.max_upload_bytes;
    if content.len() as u64 > max_size {
        return Err(ApiError::TooLarge {
            message: "File too large (max 100MB)".to_string(),
            max_size,
        });
    }

    let file_id = state
        .store
        .store(&filename, file_type, &format, &content)
        .await
        .map_err(|e| {
            warn!(%e, "Failed to store upload");
            ApiError::Internal("Upload failed".to_string())
        })?;

    // Duration limit applies to video; probing needs the stored file.
    if file_type == FileKind::Video {
        if let Err(e) = check_video_duration(&state, &file_id).await {
            state.store.remove(&file_id).await;
            state.cache.remove_all(&file_id).await;
            return Err(e);
        }
    }

    state.pipeline.start(file_id.clone());

    info!(%file_id, filename, "Upload accepted");
    Ok(Json(json!({
        "file_id": file_id,
        "status": ProcessingStatus::Uploaded,
        "message": "File uploaded successfully and processing started",
    })))
}

async fn check_video_duration(state: &AppState, file_id: &str) -> Result<(), ApiError> {
    let Some(path) = state.store.file_path(file_id).await else {
        return Err(ApiError::Internal("Upload failed".to_string()));
    };

    let duration = ffmpeg::probe_duration_secs(&state.settings.processing.ffprobe_path, &path)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Could not read video metadata: {e}")))?;

    let max = state.settings.limits.max_video_duration_secs;
    if duration > max {
        return Err(ApiError::TooLarge {
            message: format!("Video too long ({duration:.1}s, max {max:.0}s)"),
            max_size: state.settings.limits.max_upload_bytes,
        });
    }
    Ok(())
}

/// `GET /api/upload/{file_id}/status`
pub async fn status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let meta = state.store.get(&file_id).await;
    let record = state.pipeline.status(&file_id).await;

    if meta.is_none() && record.is_none() {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let is_processing = state.pipeline.is_running(&file_id);
    let response = match record {
        Some(record) => json!({
            "file_id": file_id,
            "status": record.status,
            "progress": record.progress,
            "message": format!("File is {}", record.status),
            "timestamp": record.timestamp,
            "is_processing": is_processing,
        }),
        None => {
            // Known file without a live record: report the stored status.
            let status = meta.map(|m| m.status).unwrap_or(ProcessingStatus::Completed);
            json!({
                "file_id": file_id,
                "status": status,
                "progress": fallback_progress(status),
                "message": format!("File is {status}"),
                "timestamp": Utc::now(),
                "is_processing": is_processing,
            })
        }
    };
    Ok(Json(response))
}

/// Progress map used when only the stored record is available. Slightly
/// different mid-stage values than the pipeline's own map, kept for
/// compatibility with existing clients.
fn fallback_progress(status: ProcessingStatus) -> u8 {
    match status {
        ProcessingStatus::Uploaded => 10,
        ProcessingStatus::ExtractingAudio => 30,
        ProcessingStatus::Transcribing => 60,
        ProcessingStatus::Analyzing => 90,
        ProcessingStatus::Completed => 100,
        ProcessingStatus::Failed => 0,
    }
}

/// `GET /api/upload/files`
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let entries = state.store.list().await;
    let mut files = Vec::with_capacity(entries.len());
    for (file_id, meta) in entries {
        let is_processing = state.pipeline.is_running(&file_id);
        files.push(json!({
            "file_id": file_id,
            "filename": meta.original_filename,
            "file_type": meta.file_type,
            "file_size": meta.file_size,
            "upload_time": meta.upload_time,
            "expires_at": meta.expires_at,
            "status": meta.status,
            "progress": fallback_progress(meta.status),
            "is_processing": is_processing,
        }));
    }

    let total_count = files.len();
    Ok(Json(json!({
        "files": files,
        "total_count": total_count,
        "message": format!("Found {total_count} uploaded files"),
    })))
}

/// `DELETE /api/upload/{file_id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut deleted_items = Vec::new();

    if state.store.remove(&file_id).await {
        deleted_items.push("disk");
        deleted_items.push("metadata");
    }
    let stats = state.cache.remove_all(&file_id).await;
    if stats.removed_count > 0 {
        deleted_items.push("cache");
    }

    if deleted_items.is_empty() {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    info!(%file_id, ?deleted_items, "File deleted");
    Ok(Json(json!({
        "file_id": file_id,
        "deleted_items": deleted_items,
        "message": format!("File {file_id} deleted successfully"),
    })))
}
