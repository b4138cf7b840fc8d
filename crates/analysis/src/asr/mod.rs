pub mod cadence;

#[cfg(feature = "local-whisper")]
pub mod local_whisper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request to transcribe a complete audio artifact.
pub struct TranscribeRequest {
    /// PCM audio at 16kHz mono, f32 normalized [-1.0, 1.0].
    pub audio_pcm_16k_mono: Vec<f32>,
    /// Optional language hint (ISO 639-1, e.g. "ar").
    pub language_hint: Option<String>,
    /// Sample rate (always 16000 for this pipeline).
    pub sample_rate: u32,
}

/// A single recognized word with timing relative to the start of the audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

/// Raw output of a speech-to-text backend, before it becomes a Transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechToTextOutput {
    pub text: String,
    pub words: Vec<RecognizedWord>,
    pub language: Option<String>,
    pub confidence: Option<f64>,
}

/// Trait for pluggable speech-to-text backends.
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribes a complete audio artifact into timed words.
    async fn transcribe(&self, request: TranscribeRequest) -> anyhow::Result<SpeechToTextOutput>;

    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Whether this backend supports a given language code.
    fn supports_language(&self, lang: &str) -> bool;
}
