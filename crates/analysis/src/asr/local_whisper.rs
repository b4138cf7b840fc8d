use async_trait::async_trait;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{RecognizedWord, SpeechToText, SpeechToTextOutput, TranscribeRequest};

/// Local Whisper backend using whisper.cpp via whisper-rs.
pub struct LocalWhisperStt {
    ctx: WhisperContext,
    default_language: Option<String>,
}

impl LocalWhisperStt {
    /// Loads a GGML Whisper model from disk (e.g. ggml-base.bin).
    pub fn new(model_path: &str, default_language: Option<String>) -> anyhow::Result<Self> {
        info!(model_path, "Loading Whisper model");
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| anyhow::anyhow!("Failed to load Whisper model '{}': {}", model_path, e))?;
        info!("Whisper model loaded");
        Ok(Self {
            ctx,
            default_language,
        })
    }
}

#[async_trait]
impl SpeechToText for LocalWhisperStt {
    async fn transcribe(&self, request: TranscribeRequest) -> anyhow::Result<SpeechToTextOutput> {
        let audio = request.audio_pcm_16k_mono;
        let lang = request
            .language_hint
            .or_else(|| self.default_language.clone());

        // whisper-rs is CPU-bound; run on the blocking thread pool
        let ctx_ptr = &self.ctx as *const WhisperContext;
        // SAFETY: WhisperContext is Send+Sync, and we create a new state per call
        let ctx_ref = unsafe { &*ctx_ptr };

        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<SpeechToTextOutput> {
            let mut state = ctx_ref
                .create_state()
                .map_err(|e| anyhow::anyhow!("Failed to create Whisper state: {}", e))?;

            let mut params = FullParams::new(SamplingStrategy::BeamSearch {
                beam_size: 5,
                patience: 1.0,
            });

            if let Some(ref lang) = lang {
                params.set_language(Some(lang));
            } else {
                params.set_detect_language(true);
            }

            // Transcribe in the source language; translation happens later
            // through the Translator adapter.
            params.set_translate(false);
            params.set_print_progress(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_single_segment(false);
            params.set_no_speech_thold(0.6);
            params.set_suppress_blank(true);

            state
                .full(params, &audio)
                .map_err(|e| anyhow::anyhow!("Whisper transcription failed: {}", e))?;

            let n_segments = state.full_n_segments();

            let mut text = String::new();
            let mut words = Vec::new();
            for i in 0..n_segments {
                let Some(segment) = state.get_segment(i) else {
                    continue;
                };
                let Ok(seg_text) = segment.to_str() else {
                    continue;
                };
                text.push_str(seg_text);

                // Whisper reports timestamps per segment in centiseconds;
                // distribute the span evenly over the segment's words.
                let seg_start = segment.start_timestamp() as f64 / 100.0;
                let seg_end = segment.end_timestamp() as f64 / 100.0;
                let seg_words: Vec<&str> = seg_text.split_whitespace().collect();
                if seg_words.is_empty() || seg_end <= seg_start {
                    continue;
                }
                let step = (seg_end - seg_start) / seg_words.len() as f64;
                for (j, word) in seg_words.iter().enumerate() {
                    words.push(RecognizedWord {
                        word: (*word).to_string(),
                        start_time: seg_start + j as f64 * step,
                        end_time: seg_start + (j + 1) as f64 * step,
                        confidence: 0.9,
                    });
                }
            }

            let text = text.trim().to_string();
            let detected_lang = whisper_rs::get_lang_str(state.full_lang_id_from_state())
                .map(|s| s.to_string())
                .or(lang);

            debug!(text_len = text.len(), ?detected_lang, "Whisper transcription complete");

            Ok(SpeechToTextOutput {
                text,
                words,
                language: detected_lang,
                confidence: None,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("Whisper task join error: {}", e))??;

        Ok(result)
    }

    fn name(&self) -> &str {
        "whisper"
    }

    fn supports_language(&self, _lang: &str) -> bool {
        true
    }
}
