use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sawtfeel_analysis::audio::{self, wav};
use sawtfeel_analysis::{SpeechToText, TextSentiment, ToneClassifier, TranscribeRequest, Translator, fusion};
use sawtfeel_config::ProcessingSettings;
use sawtfeel_models::{
    EmotionAnalysis, EmotionSegment, PipelineEvent, ProcessingStatus, StatusRecord, StoredFileMeta,
    Transcript, WordSegment,
};
use serde_json::json;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::cache::SegmentCache;
use crate::store::FileStore;

/// The externally supplied analysis capabilities, injected once at startup.
/// Demo doubles and real backends implement the same traits.
pub struct Adapters {
    pub stt: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub text_sentiment: Arc<dyn TextSentiment>,
    pub tone: Arc<dyn ToneClassifier>,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("processing cancelled")]
    Cancelled,
    #[error("stage '{0}' timed out")]
    Timeout(&'static str),
    #[error("file metadata not found")]
    MissingFile,
    #[error("audio extraction failed: {0}")]
    Extract(String),
    #[error("transcription failed: {0}")]
    Transcribe(String),
    #[error("emotion analysis failed: {0}")]
    Analyze(String),
    #[error("failed to cache results: {0}")]
    Cache(String),
}

struct RunHandle {
    cancel: Arc<AtomicBool>,
    abort: tokio::task::AbortHandle,
}

/// Decoded audio artifact handed between stages.
struct ExtractedAudio {
    samples: Vec<f32>,
    duration: f64,
    artifact_path: String,
}

/// Drives the fixed per-file pipeline (extract → transcribe → analyze →
/// complete), writing a fresh status record at every transition and caching
/// every stage's output. At most one run per file id is in flight; the runs
/// map is the single piece of shared state between the upload handler and
/// the status/cancel handlers, mutated only through atomic entry operations.
pub struct PipelineOrchestrator {
    store: Arc<FileStore>,
    cache: Arc<SegmentCache>,
    adapters: Adapters,
    settings: ProcessingSettings,
    runs: DashMap<String, RunHandle>,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<FileStore>,
        cache: Arc<SegmentCache>,
        adapters: Adapters,
        settings: ProcessingSettings,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            store,
            cache,
            adapters,
            settings,
            runs: DashMap::new(),
            event_tx,
        })
    }

    /// New receiver for pipeline transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Starts a background run for a file. Returns false (and does nothing)
    /// when a run for this id is already in flight — two racing calls can
    /// never both spawn, because the decision happens under the map entry.
    pub fn start(self: &Arc<Self>, file_id: String) -> bool {
        match self.runs.entry(file_id.clone()) {
            Entry::Occupied(_) => {
                warn!(%file_id, "Processing already active for file");
                false
            }
            Entry::Vacant(vacant) => {
                let cancel = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&cancel);
                let orchestrator = Arc::clone(self);
                let id = file_id.clone();

                let handle = tokio::spawn(async move {
                    orchestrator.run(&id, &flag).await;
                    orchestrator.runs.remove(&id);
                });

                vacant.insert(RunHandle {
                    cancel,
                    abort: handle.abort_handle(),
                });
                info!(%file_id, "Started background processing run");
                true
            }
        }
    }

    pub fn is_running(&self, file_id: &str) -> bool {
        self.runs.contains_key(file_id)
    }

    pub fn active_run_count(&self) -> usize {
        self.runs.len()
    }

    /// Requests cooperative cancellation. The run observes the flag at the
    /// next stage boundary; a stage mid-flight in an adapter call finishes
    /// and its result is discarded.
    pub fn cancel(&self, file_id: &str) -> bool {
        match self.runs.get(file_id) {
            Some(handle) => {
                handle.cancel.store(true, Ordering::SeqCst);
                info!(%file_id, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Current status with cache-only recovery: a live status record wins;
    /// otherwise cached final artifacts imply a completed earlier run, a
    /// cached error record implies a failed one, and anything else is an
    /// unknown file.
    pub async fn status(&self, file_id: &str) -> Option<StatusRecord> {
        if let Some(record) = self.cache.get_as::<StatusRecord>(file_id, "status").await {
            return Some(record);
        }

        if self.cache.contains(file_id, "complete_results").await {
            return Some(StatusRecord::now(
                file_id.to_string(),
                ProcessingStatus::Completed,
            ));
        }

        if let Some(error) = self.cache.get(file_id, "error").await {
            let message = error
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("processing failed")
                .to_string();
            return Some(StatusRecord::failed(file_id.to_string(), message));
        }

        None
    }

    async fn run(&self, file_id: &str, cancel: &AtomicBool) {
        // Nothing may escape the run boundary: every failure is recorded and
        // surfaced as a FAILED status instead.
        match self.execute(file_id, cancel).await {
            Ok(()) => {
                info!(%file_id, "Processing pipeline completed");
            }
            Err(e) => {
                error!(%file_id, %e, "Processing pipeline failed");
                self.fail(file_id, &e.to_string()).await;
            }
        }
    }

    async fn execute(&self, file_id: &str, cancel: &AtomicBool) -> Result<(), StageError> {
        let meta = self.store.get(file_id).await.ok_or(StageError::MissingFile)?;

        self.checkpoint(cancel)?;
        self.transition(file_id, ProcessingStatus::ExtractingAudio).await;
        let audio = self
            .bounded("extract", self.extract(file_id, &meta))
            .await?;

        self.checkpoint(cancel)?;
        self.transition(file_id, ProcessingStatus::Transcribing).await;
        let transcript = self
            .bounded("transcribe", self.transcribe(file_id, &audio))
            .await?;

        self.checkpoint(cancel)?;
        self.transition(file_id, ProcessingStatus::Analyzing).await;
        let analysis = self
            .bounded("analyze", self.analyze(file_id, &transcript, &audio))
            .await?;

        self.checkpoint(cancel)?;
        self.complete(file_id, &audio, &transcript, &analysis).await?;
        self.transition(file_id, ProcessingStatus::Completed).await;

        self.cleanup_temp_files(file_id).await;
        Ok(())
    }

    fn checkpoint(&self, cancel: &AtomicBool) -> Result<(), StageError> {
        if cancel.load(Ordering::SeqCst) {
            Err(StageError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = Result<T, StageError>>,
    ) -> Result<T, StageError> {
        tokio::time::timeout(Duration::from_secs(self.settings.stage_timeout_secs), fut)
            .await
            .map_err(|_| StageError::Timeout(stage))?
    }

    /// Stage 1: normalize the upload to a 16kHz mono PCM artifact. WAV is
    /// decoded and resampled in-process; every other container goes through
    /// ffmpeg.
    async fn extract(
        &self,
        file_id: &str,
        meta: &StoredFileMeta,
    ) -> Result<ExtractedAudio, StageError> {
        let input = meta.stored_path.clone();
        let artifact = self.cache.audio_artifact_path(file_id);

        if let Some(parent) = artifact.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }

        let samples = if meta.format == "WAV" {
            let source = input.clone();
            let decoded = tokio::task::spawn_blocking(move || wav::read_wav_16k_mono(source))
                .await
                .map_err(|e| StageError::Extract(format!("decode task failed: {e}")))?
                .map_err(|e| StageError::Extract(e.to_string()))?;

            let out = artifact.clone();
            let to_write = decoded.clone();
            tokio::task::spawn_blocking(move || wav::write_wav_16k_mono(out, &to_write))
                .await
                .map_err(|e| StageError::Extract(format!("encode task failed: {e}")))?
                .map_err(|e| StageError::Extract(e.to_string()))?;
            decoded
        } else {
            audio::ffmpeg::extract_audio_16k_mono(&self.settings.ffmpeg_path, &input, &artifact)
                .await
                .map_err(|e| StageError::Extract(e.to_string()))?;

            let out = artifact.clone();
            tokio::task::spawn_blocking(move || wav::read_wav_16k_mono(out))
                .await
                .map_err(|e| StageError::Extract(format!("decode task failed: {e}")))?
                .map_err(|e| StageError::Extract(e.to_string()))?
        };

        if samples.is_empty() {
            return Err(StageError::Extract(
                "extraction produced zero-length audio".to_string(),
            ));
        }

        let duration = samples.len() as f64 / 16000.0;
        info!(%file_id, duration, "Audio artifact ready");

        Ok(ExtractedAudio {
            samples,
            duration,
            artifact_path: artifact.to_string_lossy().to_string(),
        })
    }

    /// Stage 2: speech-to-text plus a secondary translated text, cached as
    /// the immutable transcript for this file.
    async fn transcribe(
        &self,
        file_id: &str,
        audio: &ExtractedAudio,
    ) -> Result<Transcript, StageError> {
        let output = self
            .adapters
            .stt
            .transcribe(TranscribeRequest {
                audio_pcm_16k_mono: audio.samples.clone(),
                language_hint: Some(self.settings.language.clone()),
                sample_rate: 16000,
            })
            .await
            .map_err(|e| StageError::Transcribe(e.to_string()))?;

        let words = output
            .words
            .into_iter()
            .map(|w| WordSegment::new(w.word, w.start_time, w.end_time, w.confidence))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StageError::Transcribe(e.to_string()))?;

        let mut transcript = Transcript::new(
            file_id.to_string(),
            output.text,
            words,
            output
                .language
                .unwrap_or_else(|| self.settings.language.clone()),
            output.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        )
        .map_err(|e| StageError::Transcribe(e.to_string()))?;

        if !transcript.text.is_empty() && transcript.english_text.is_none() {
            match self.adapters.translator.translate(&transcript.text).await {
                Ok(english) => transcript.english_text = Some(english),
                Err(e) => warn!(%file_id, %e, "Translation failed, keeping source text only"),
            }
        }

        self.cache
            .put(file_id, "transcript", &transcript)
            .await
            .map_err(|e| StageError::Cache(e.to_string()))?;

        info!(
            %file_id,
            words = transcript.words.len(),
            chars = transcript.text.chars().count(),
            "Transcript cached"
        );
        Ok(transcript)
    }

    /// Stage 3: fixed-width windows over the timeline, both emotion signal
    /// paths per window, fused per window, plus the file-level dominant
    /// emotion.
    async fn analyze(
        &self,
        file_id: &str,
        transcript: &Transcript,
        audio: &ExtractedAudio,
    ) -> Result<EmotionAnalysis, StageError> {
        let windows = audio::split_windows(
            &audio.samples,
            16000,
            self.settings.segment_duration_secs,
        );

        let mut segments = Vec::with_capacity(windows.len());
        for window in &windows {
            let window_text: Vec<&str> = transcript
                .words
                .iter()
                .filter(|w| w.start_time >= window.start_time && w.end_time <= window.end_time)
                .map(|w| w.word.as_str())
                .collect();
            let text = window_text.join(" ");

            let (text_emotion, text_conf) = self
                .adapters
                .text_sentiment
                .classify_text(&text)
                .await
                .map_err(|e| StageError::Analyze(e.to_string()))?;
            let (tone_emotion, tone_conf) = self
                .adapters
                .tone
                .classify_tone(&window.samples, 16000)
                .await
                .map_err(|e| StageError::Analyze(e.to_string()))?;

            let (combined_emotion, combined_conf) =
                fusion::fuse(text_emotion, text_conf, tone_emotion, tone_conf);

            let segment = EmotionSegment::new(
                window.start_time,
                window.end_time,
                text_emotion,
                text_conf,
                tone_emotion,
                tone_conf,
                combined_emotion,
                combined_conf,
            )
            .map_err(|e| StageError::Analyze(e.to_string()))?;
            segments.push(segment);
        }

        let (overall_emotion, overall_confidence) = fusion::dominant_emotion(&segments);

        let analysis = EmotionAnalysis::new(
            file_id.to_string(),
            segments,
            overall_emotion,
            overall_confidence.clamp(0.0, 1.0),
        )
        .map_err(|e| StageError::Analyze(e.to_string()))?;

        self.cache
            .put(file_id, "emotions", &analysis)
            .await
            .map_err(|e| StageError::Cache(e.to_string()))?;

        info!(
            %file_id,
            segments = analysis.segments.len(),
            overall = %analysis.overall_emotion,
            "Emotion analysis cached"
        );
        Ok(analysis)
    }

    /// Stage 4: bundle everything under one key for single-read consumers.
    async fn complete(
        &self,
        file_id: &str,
        audio: &ExtractedAudio,
        transcript: &Transcript,
        analysis: &EmotionAnalysis,
    ) -> Result<(), StageError> {
        let bundle = json!({
            "audio": {
                "duration": audio.duration,
                "artifact_path": audio.artifact_path,
            },
            "transcript": transcript,
            "emotion_analysis": analysis,
        });
        self.cache
            .put(file_id, "complete_results", &bundle)
            .await
            .map_err(|e| StageError::Cache(e.to_string()))?;
        Ok(())
    }

    /// Removes leftover partial files from interrupted extractions. Missing
    /// files are not errors.
    async fn cleanup_temp_files(&self, file_id: &str) {
        let partial = self
            .cache
            .audio_artifact_path(file_id)
            .with_extension("wav.part");
        match tokio::fs::remove_file(&partial).await {
            Ok(()) => info!(%file_id, "Removed leftover partial artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(%file_id, %e, "Failed to remove partial artifact"),
        }
    }

    async fn transition(&self, file_id: &str, status: ProcessingStatus) {
        let record = StatusRecord::now(file_id.to_string(), status);
        if let Err(e) = self.cache.put(file_id, "status", &record).await {
            warn!(%file_id, %e, "Failed to cache status record");
        }
        self.store.set_status(file_id, status).await;
        let _ = self.event_tx.send(PipelineEvent::from(&record));
        info!(%file_id, %status, progress = record.progress, "Status transition");
    }

    async fn fail(&self, file_id: &str, message: &str) {
        let record = StatusRecord::failed(file_id.to_string(), message.to_string());
        if let Err(e) = self.cache.put(file_id, "status", &record).await {
            warn!(%file_id, %e, "Failed to cache failure status");
        }
        let error_blob = json!({
            "error": message,
            "timestamp": Utc::now(),
            "status": "failed",
        });
        if let Err(e) = self.cache.put(file_id, "error", &error_blob).await {
            warn!(%file_id, %e, "Failed to cache error record");
        }
        self.store.set_status(file_id, ProcessingStatus::Failed).await;
        let _ = self.event_tx.send(PipelineEvent::from(&record));
    }
}

impl Drop for PipelineOrchestrator {
    fn drop(&mut self) {
        for entry in self.runs.iter() {
            entry.value().abort.abort();
        }
    }
}
