use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One realtime client's playback position. Created on connect, removed on
/// disconnect, mutated only through its owning session's message handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackCursor {
    pub session_id: String,
    pub file_id: String,
    pub current_time: f64,
    pub is_playing: bool,
    pub is_seeking: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PlaybackCursor {
    pub fn new(file_id: String) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            file_id,
            current_time: 0.0,
            is_playing: false,
            is_seeking: false,
            created_at: now,
            last_updated: now,
        }
    }
}
