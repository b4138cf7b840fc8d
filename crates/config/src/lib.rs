use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application settings, loaded from defaults, an optional `sawtfeel.toml`
/// next to the binary, and `SAWTFEEL__*` environment variables
/// (double-underscore separated, e.g. `SAWTFEEL__SERVER__PORT=9000`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub limits: LimitSettings,
    pub processing: ProcessingSettings,
    pub realtime: RealtimeSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory for raw uploaded files.
    pub upload_dir: String,
    /// Directory for cached processing artifacts (JSON blobs + extracted audio).
    pub cache_dir: String,
    /// Retention window for uploads and cache entries, measured from write time.
    pub retention_hours: u64,
    /// Total cache size budget enforced by the periodic sweep.
    pub max_cache_size_mb: u64,
    /// Interval between cache sweeps.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    pub max_upload_bytes: u64,
    pub max_video_duration_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingSettings {
    /// Language hint passed to the speech-to-text backend.
    pub language: String,
    /// Width of the emotion-analysis windows in seconds.
    pub segment_duration_secs: f64,
    /// Upper bound on any single pipeline stage.
    pub stage_timeout_secs: u64,
    /// Speech-to-text backend name: "cadence" (built-in) or "whisper"
    /// (requires the `local-whisper` feature and a model path).
    pub stt_backend: String,
    /// Path to a Whisper GGUF/GGML model (whisper backend only).
    pub whisper_model_path: Option<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// Sessions idle longer than this are dropped by the sweep. Covers
    /// clients that vanish without a clean WebSocket close.
    pub session_idle_timeout_secs: u64,
    pub session_sweep_interval_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000_i64)?
            .set_default("storage.upload_dir", "temp_uploads")?
            .set_default("storage.cache_dir", "cache")?
            .set_default("storage.retention_hours", 24_i64)?
            .set_default("storage.max_cache_size_mb", 1000_i64)?
            .set_default("storage.sweep_interval_secs", 3600_i64)?
            .set_default("limits.max_upload_bytes", 100 * 1024 * 1024_i64)?
            .set_default("limits.max_video_duration_secs", 120.0)?
            .set_default("processing.language", "ar")?
            .set_default("processing.segment_duration_secs", 2.0)?
            .set_default("processing.stage_timeout_secs", 300_i64)?
            .set_default("processing.stt_backend", "cadence")?
            .set_default("processing.ffmpeg_path", "ffmpeg")?
            .set_default("processing.ffprobe_path", "ffprobe")?
            .set_default("realtime.session_idle_timeout_secs", 600_i64)?
            .set_default("realtime.session_sweep_interval_secs", 60_i64)?
            .add_source(File::with_name("sawtfeel").required(false))
            .add_source(
                Environment::with_prefix("SAWTFEEL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
