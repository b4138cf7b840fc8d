pub mod emotion;
pub mod file;
pub mod playback;
pub mod status;
pub mod transcript;

pub use emotion::{Emotion, EmotionAnalysis, EmotionSegment};
pub use file::{FileKind, StoredFileMeta, detect_format};
pub use playback::PlaybackCursor;
pub use status::{PipelineEvent, ProcessingStatus, StatusRecord};
pub use transcript::{Transcript, WordSegment};

use thiserror::Error;

/// Construction-time invariant violations. Models reject bad data instead
/// of repairing it.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("end_time must be greater than start_time ({start} >= {end})")]
    InvertedInterval { start: f64, end: f64 },
    #[error("confidence {0} out of range [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("time {0} must be non-negative")]
    NegativeTime(f64),
    #[error("segments must be in chronological order (segment {index})")]
    OutOfOrder { index: usize },
    #[error("segments must not overlap (segment {index})")]
    Overlap { index: usize },
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}
