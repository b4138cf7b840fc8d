use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sawtfeel_models::ProcessingStatus;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    UnsupportedFormat(String),
    TooLarge { message: String, max_size: u64 },
    NotReady { message: String, status: ProcessingStatus },
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {msg}"),
            ApiError::TooLarge { message, .. } => write!(f, "Too large: {message}"),
            ApiError::NotReady { message, .. } => write!(f, "Not ready: {message}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Structured JSON with an `error` field, never a raw exception
        // message or backtrace through the API boundary.
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::UnsupportedFormat(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                json!({
                    "error": msg,
                    "supported_formats": sawtfeel_models::file::supported_formats(),
                }),
            ),
            ApiError::TooLarge { message, max_size } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": message, "max_size": max_size }),
            ),
            ApiError::NotReady { message, status } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "status": status }),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}
