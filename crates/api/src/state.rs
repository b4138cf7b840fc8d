use std::sync::Arc;

use sawtfeel_analysis::asr::cadence::CadenceStt;
use sawtfeel_analysis::emotion::lexicon::LexiconSentiment;
use sawtfeel_analysis::emotion::tone::SpectralTone;
use sawtfeel_analysis::translate::GlossaryTranslator;
use sawtfeel_analysis::{SpeechToText, Translator};
use sawtfeel_config::Settings;
use sawtfeel_services::{Adapters, FileStore, PipelineOrchestrator, SegmentCache, SessionRegistry};
use tracing::warn;

use crate::ws::storage::WsStorage;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<FileStore>,
    pub cache: Arc<SegmentCache>,
    pub pipeline: Arc<PipelineOrchestrator>,
    pub sessions: Arc<SessionRegistry>,
    pub translator: Arc<dyn Translator>,
    pub ws_storage: Arc<WsStorage>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let store = Arc::new(
            FileStore::open(&settings.storage.upload_dir, settings.storage.retention_hours).await?,
        );
        let cache = Arc::new(SegmentCache::new(
            &settings.storage.cache_dir,
            settings.storage.retention_hours,
            settings.storage.max_cache_size_mb,
        ));

        let translator: Arc<dyn Translator> = Arc::new(GlossaryTranslator);
        let adapters = Adapters {
            stt: build_stt(&settings)?,
            translator: Arc::clone(&translator),
            text_sentiment: Arc::new(LexiconSentiment),
            tone: Arc::new(SpectralTone),
        };

        let pipeline = PipelineOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            adapters,
            settings.processing.clone(),
        );

        Ok(Self {
            settings: Arc::new(settings),
            store,
            cache,
            pipeline,
            sessions: Arc::new(SessionRegistry::new()),
            translator,
            ws_storage: Arc::new(WsStorage::new()),
        })
    }
}

fn build_stt(settings: &Settings) -> anyhow::Result<Arc<dyn SpeechToText>> {
    match settings.processing.stt_backend.as_str() {
        #[cfg(feature = "local-whisper")]
        "whisper" => {
            let model_path = settings
                .processing
                .whisper_model_path
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("whisper backend requires a model path"))?;
            let backend = sawtfeel_analysis::asr::local_whisper::LocalWhisperStt::new(
                model_path,
                Some(settings.processing.language.clone()),
            )?;
            Ok(Arc::new(backend))
        }
        "cadence" => Ok(Arc::new(CadenceStt)),
        other => {
            warn!(backend = other, "Unknown speech-to-text backend, using cadence");
            Ok(Arc::new(CadenceStt))
        }
    }
}
