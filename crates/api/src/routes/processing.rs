use axum::{
    Json,
    extract::{Path, State},
};
use sawtfeel_models::{EmotionAnalysis, ProcessingStatus, Transcript};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{error::ApiError, state::AppState};

/// Rejects with 409 while the file is still being processed, 404 when it is
/// unknown everywhere. A file with cached artifacts but no metadata record
/// (restart recovery) passes.
async fn ensure_ready(state: &AppState, file_id: &str, artifact_kind: &str) -> Result<(), ApiError> {
    if let Some(meta) = state.store.get(file_id).await {
        if meta.status != ProcessingStatus::Completed {
            return Err(ApiError::NotReady {
                message: format!("{artifact_kind} not yet available"),
                status: meta.status,
            });
        }
        return Ok(());
    }

    if state.cache.contains(file_id, "transcript").await
        || state.cache.contains(file_id, "emotions").await
    {
        return Ok(());
    }

    Err(ApiError::NotFound("File not found".to_string()))
}

/// `GET /api/processing/{file_id}/transcript`
pub async fn transcript(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ensure_ready(&state, &file_id, "Transcript").await?;

    let Some(mut transcript) = state
        .cache
        .get_as::<Transcript>(&file_id, "transcript")
        .await
    else {
        warn!(%file_id, "No cached transcript, processing may have failed");
        return Err(ApiError::NotFound(
            "Transcript not available - processing may have failed".to_string(),
        ));
    };

    // Older cache entries may predate translation; fill it in on the way out.
    if transcript.english_text.is_none() && !transcript.text.is_empty() {
        match state.translator.translate(&transcript.text).await {
            Ok(english) => {
                info!(%file_id, "Added English translation on the fly");
                transcript.english_text = Some(english);
            }
            Err(e) => warn!(%file_id, %e, "On-the-fly translation failed"),
        }
    }

    Ok(Json(json!({
        "file_id": file_id,
        "text": transcript.text,
        "english_text": transcript.english_text,
        "words": transcript.words,
        "language": transcript.language,
        "overall_confidence": transcript.confidence,
    })))
}

/// `GET /api/processing/{file_id}/emotions`
pub async fn emotions(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ensure_ready(&state, &file_id, "Analysis").await?;

    let Some(analysis) = state
        .cache
        .get_as::<EmotionAnalysis>(&file_id, "emotions")
        .await
    else {
        warn!(%file_id, "No cached emotion analysis");
        return Err(ApiError::NotFound(
            "Analysis not available - processing may have failed".to_string(),
        ));
    };

    Ok(Json(json!({
        "file_id": file_id,
        "overall_emotion": analysis.overall_emotion,
        "overall_confidence": analysis.overall_confidence,
        "segments": analysis.segments,
    })))
}
