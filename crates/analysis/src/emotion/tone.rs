use async_trait::async_trait;
use sawtfeel_models::Emotion;

use super::ToneClassifier;
use crate::audio::features;

/// Feature-based vocal tone classifier.
///
/// Extracts energy, pitch, zero crossing rate and spectral centroid from the
/// window and applies threshold rules: loud high-pitched speech reads as
/// anger, quiet low-pitched as sadness, busy/bright signals as joy or
/// surprise. Windows shorter than 0.1s (or silent) are (neutral, 0.5).
pub struct SpectralTone;

impl SpectralTone {
    fn classify(samples: &[f32], sample_rate: u32) -> (Emotion, f64) {
        if samples.len() < (sample_rate as usize) / 10 {
            return (Emotion::Neutral, 0.5);
        }

        let energy = features::rms_energy(samples);
        let pitch = features::pitch_estimate(samples, sample_rate);
        let zcr = features::zero_crossing_rate(samples);
        let centroid = features::spectral_centroid(samples, sample_rate);

        // Rough normalizations for typical speech ranges.
        let energy_norm = (energy * 10.0).min(1.0);
        let pitch_norm = if pitch > 0.0 {
            (pitch / 500.0).min(1.0)
        } else {
            0.0
        };
        let zcr_norm = (zcr * 4.0).min(1.0);

        if energy_norm > 0.7 && pitch_norm > 0.6 {
            (Emotion::Anger, 0.7)
        } else if energy_norm > 0.0 && energy_norm < 0.3 && pitch_norm < 0.4 {
            (Emotion::Sadness, 0.6)
        } else if zcr_norm > 0.8 {
            (Emotion::Joy, 0.6)
        } else if centroid > 2000.0 {
            (Emotion::Surprise, 0.5)
        } else {
            (Emotion::Neutral, 0.8)
        }
    }
}

#[async_trait]
impl ToneClassifier for SpectralTone {
    async fn classify_tone(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> anyhow::Result<(Emotion, f64)> {
        Ok(Self::classify(samples, sample_rate))
    }

    fn name(&self) -> &str {
        "spectral"
    }
}
