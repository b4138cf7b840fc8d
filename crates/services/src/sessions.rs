use chrono::{Duration, Utc};
use dashmap::DashMap;
use sawtfeel_models::PlaybackCursor;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error("current_time must be non-negative, got {0}")]
    NegativeTime(f64),
}

/// One playback cursor per connected realtime client. Sessions are created
/// on connect and removed on disconnect; the idle sweep catches clients that
/// vanish without a clean close.
pub struct SessionRegistry {
    sessions: DashMap<String, PlaybackCursor>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Allocates a cursor at time zero, not playing.
    pub fn create(&self, file_id: String) -> PlaybackCursor {
        let cursor = PlaybackCursor::new(file_id);
        debug!(session_id = %cursor.session_id, file_id = %cursor.file_id, "Playback session created");
        self.sessions
            .insert(cursor.session_id.clone(), cursor.clone());
        cursor
    }

    pub fn get(&self, session_id: &str) -> Option<PlaybackCursor> {
        self.sessions.get(session_id).map(|c| c.clone())
    }

    /// Moves a session's cursor. Idempotent for identical values; rejects
    /// negative times and unknown sessions.
    pub fn update(
        &self,
        session_id: &str,
        current_time: f64,
        is_playing: bool,
        is_seeking: bool,
    ) -> Result<PlaybackCursor, SessionError> {
        if current_time < 0.0 {
            return Err(SessionError::NegativeTime(current_time));
        }
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.current_time = current_time;
        entry.is_playing = is_playing;
        entry.is_seeking = is_seeking;
        entry.last_updated = Utc::now();
        Ok(entry.clone())
    }

    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            debug!(%session_id, "Playback session removed");
        }
        removed
    }

    pub fn sessions_for_file(&self, file_id: &str) -> Vec<PlaybackCursor> {
        self.sessions
            .iter()
            .filter(|entry| entry.file_id == file_id)
            .map(|entry| entry.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops sessions idle for longer than `max_idle`. Returns how many were
    /// removed.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, cursor| cursor.last_updated > cutoff);
        let removed = before - self.sessions.len();
        if removed > 0 {
            info!(removed, "Swept idle playback sessions");
        }
        removed
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
