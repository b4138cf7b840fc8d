use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one processing run. Strictly forward except that any state
/// may drop to `Failed`; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Uploaded,
    ExtractingAudio,
    Transcribing,
    Analyzing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    /// Progress percentage reported by the pipeline at each transition.
    pub fn progress(&self) -> u8 {
        match self {
            ProcessingStatus::Uploaded => 10,
            ProcessingStatus::ExtractingAudio => 25,
            ProcessingStatus::Transcribing => 50,
            ProcessingStatus::Analyzing => 80,
            ProcessingStatus::Completed => 100,
            ProcessingStatus::Failed => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Uploaded => "uploaded",
            ProcessingStatus::ExtractingAudio => "extracting_audio",
            ProcessingStatus::Transcribing => "transcribing",
            ProcessingStatus::Analyzing => "analyzing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live status snapshot for one file, overwritten on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub file_id: String,
    pub status: ProcessingStatus,
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRecord {
    pub fn now(file_id: String, status: ProcessingStatus) -> Self {
        Self {
            file_id,
            status,
            progress: status.progress(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(file_id: String, error: String) -> Self {
        Self {
            file_id,
            status: ProcessingStatus::Failed,
            progress: ProcessingStatus::Failed.progress(),
            timestamp: Utc::now(),
            error: Some(error),
        }
    }
}

/// Pipeline transition event fanned out to realtime subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    pub file_id: String,
    pub status: ProcessingStatus,
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl From<&StatusRecord> for PipelineEvent {
    fn from(record: &StatusRecord) -> Self {
        Self {
            file_id: record.file_id.clone(),
            status: record.status,
            progress: record.progress,
            timestamp: record.timestamp,
            error: record.error.clone(),
        }
    }
}
