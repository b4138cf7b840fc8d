pub mod lexicon;
pub mod tone;

use async_trait::async_trait;
use sawtfeel_models::Emotion;

/// Emotion classification over the textual content of a window.
#[async_trait]
pub trait TextSentiment: Send + Sync + 'static {
    /// Returns the dominant emotion and a confidence in [0, 1].
    async fn classify_text(&self, text: &str) -> anyhow::Result<(Emotion, f64)>;

    fn name(&self) -> &str;
}

/// Emotion classification over the vocal tone of a window.
#[async_trait]
pub trait ToneClassifier: Send + Sync + 'static {
    /// Returns the dominant emotion and a confidence in [0, 1] for a chunk
    /// of 16kHz mono PCM.
    async fn classify_tone(&self, samples: &[f32], sample_rate: u32)
    -> anyhow::Result<(Emotion, f64)>;

    fn name(&self) -> &str;
}
