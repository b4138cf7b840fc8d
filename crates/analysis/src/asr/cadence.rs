use async_trait::async_trait;
use tracing::debug;

use super::{RecognizedWord, SpeechToText, SpeechToTextOutput, TranscribeRequest};

/// Sample phrase the backend cycles through, word by word.
const SAMPLE_WORDS: [&str; 12] = [
    "هذا",
    "صوت",
    "جميل",
    "ورائع",
    "لكن",
    "الحزن",
    "يظهر",
    "احيانا",
    "والفرح",
    "يعود",
    "بسرعة",
    "كبيرة",
];

const WORD_SECS: f64 = 0.4;

/// Deterministic stand-in speech-to-text backend.
///
/// Emits one word per 0.4s of audio from a fixed Arabic phrase, so every
/// downstream consumer (windowing, sentiment lexicon, word lookups) gets
/// realistic timed data without any model on disk. This is the injected
/// demo backend, selected via `processing.stt_backend = "cadence"`.
pub struct CadenceStt;

#[async_trait]
impl SpeechToText for CadenceStt {
    async fn transcribe(&self, request: TranscribeRequest) -> anyhow::Result<SpeechToTextOutput> {
        let duration = request.audio_pcm_16k_mono.len() as f64 / request.sample_rate as f64;
        if duration <= 0.0 {
            anyhow::bail!("empty audio artifact");
        }

        let mut words = Vec::new();
        let mut start = 0.0;
        let mut i = 0usize;
        while start < duration {
            let end = (start + WORD_SECS).min(duration);
            if end - start < 0.05 {
                break;
            }
            words.push(RecognizedWord {
                word: SAMPLE_WORDS[i % SAMPLE_WORDS.len()].to_string(),
                start_time: start,
                end_time: end,
                confidence: 0.9,
            });
            start = end;
            i += 1;
        }

        let text = words
            .iter()
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        debug!(
            duration,
            word_count = words.len(),
            "Cadence transcription produced"
        );

        Ok(SpeechToTextOutput {
            text,
            words,
            language: Some(
                request
                    .language_hint
                    .unwrap_or_else(|| "ar".to_string()),
            ),
            confidence: Some(0.9),
        })
    }

    fn name(&self) -> &str {
        "cadence"
    }

    fn supports_language(&self, _lang: &str) -> bool {
        true
    }
}
