use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Word-level timing and confidence data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSegment {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

impl WordSegment {
    pub fn new(
        word: String,
        start_time: f64,
        end_time: f64,
        confidence: f64,
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
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ModelError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            word,
            start_time,
            end_time,
            confidence,
        })
    }
}

/// Immutable transcription result with word-level timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub file_id: String,
    pub text: String,
    pub english_text: Option<String>,
    pub words: Vec<WordSegment>,
    pub language: String,
    pub confidence: f64,
}

impl Transcript {
    pub fn new(
        file_id: String,
        text: String,
        words: Vec<WordSegment>,
        language: String,
        confidence: f64,
    ) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ModelError::ConfidenceOutOfRange(confidence));
        }
        for i in 1..words.len() {
            if words[i].start_time < words[i - 1].start_time {
                return Err(ModelError::OutOfOrder { index: i });
            }
        }
        Ok(Self {
            file_id,
            text,
            english_text: None,
            words,
            language,
            confidence,
        })
    }

    pub fn duration(&self) -> f64 {
        self.words.last().map(|w| w.end_time).unwrap_or(0.0)
    }

    /// The word being spoken at `time`, or, between words, the most recently
    /// completed word. Never a future word. Returns `(index, word)`.
    pub fn word_at(&self, time: f64) -> Option<(usize, &WordSegment)> {
        let mut last_completed = None;
        for (i, word) in self.words.iter().enumerate() {
            if word.start_time <= time && time <= word.end_time {
                return Some((i, word));
            }
            if word.end_time < time {
                last_completed = Some((i, word));
            } else {
                break;
            }
        }
        last_completed
    }
}
