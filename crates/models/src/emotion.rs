use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Closed set of emotion labels produced by both analysis paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Sadness,
    Joy,
    Neutral,
    Fear,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Anger,
        Emotion::Sadness,
        Emotion::Joy,
        Emotion::Neutral,
        Emotion::Fear,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Joy => "joy",
            Emotion::Neutral => "neutral",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis window with both signal paths and their fused result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub textual_emotion: Emotion,
    pub textual_confidence: f64,
    pub tonal_emotion: Emotion,
    pub tonal_confidence: f64,
    pub combined_emotion: Emotion,
    pub combined_confidence: f64,
}

impl EmotionSegment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_time: f64,
        end_time: f64,
        textual_emotion: Emotion,
        textual_confidence: f64,
        tonal_emotion: Emotion,
        tonal_confidence: f64,
        combined_emotion: Emotion,
        combined_confidence: f64,
    ) -> Result<Self, ModelError> {
        if start_time < 0.0 {
            return Err(ModelError::NegativeTime(start_time));
        }
        if end_time <= start_time {
            return Err(ModelError::InvertedInterval {
                start: start_time,
                end: end_time,
            });
        }
        for conf in [textual_confidence, tonal_confidence, combined_confidence] {
            if !(0.0..=1.0).contains(&conf) {
                return Err(ModelError::ConfidenceOutOfRange(conf));
            }
        }
        Ok(Self {
            start_time,
            end_time,
            textual_emotion,
            textual_confidence,
            tonal_emotion,
            tonal_confidence,
            combined_emotion,
            combined_confidence,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Per-file emotion timeline. Segments are chronological and non-overlapping;
/// violations are rejected at construction, never silently repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub file_id: String,
    pub segments: Vec<EmotionSegment>,
    pub overall_emotion: Emotion,
    pub overall_confidence: f64,
}

impl EmotionAnalysis {
    pub fn new(
        file_id: String,
        segments: Vec<EmotionSegment>,
        overall_emotion: Emotion,
        overall_confidence: f64,
    ) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&overall_confidence) {
            return Err(ModelError::ConfidenceOutOfRange(overall_confidence));
        }
        for i in 1..segments.len() {
            if segments[i].start_time < segments[i - 1].start_time {
                return Err(ModelError::OutOfOrder { index: i });
            }
            if segments[i].start_time < segments[i - 1].end_time {
                return Err(ModelError::Overlap { index: i });
            }
        }
        Ok(Self {
            file_id,
            segments,
            overall_emotion,
            overall_confidence,
        })
    }

    /// First segment covering `time`, if any.
    pub fn segment_at(&self, time: f64) -> Option<&EmotionSegment> {
        self.segments.iter().find(|s| s.contains(time))
    }
}
