use std::io::Cursor;
use std::time::Duration;

use sawtfeel_api::state::AppState;
use sawtfeel_api::{build_router, spawn_background_tasks};
use sawtfeel_config::{
    LimitSettings, ProcessingSettings, RealtimeSettings, ServerSettings, Settings, StorageSettings,
};
use serde_json::Value;
use tempfile::TempDir;

/// One live application instance on an ephemeral port, with scratch storage
/// directories that vanish when the fixture drops.
pub struct TestApp {
    pub base_url: String,
    pub ws_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    _upload_dir: TempDir,
    _cache_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let upload_dir = tempfile::tempdir().expect("create upload dir");
        let cache_dir = tempfile::tempdir().expect("create cache dir");

        let settings = Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageSettings {
                upload_dir: upload_dir.path().to_string_lossy().to_string(),
                cache_dir: cache_dir.path().to_string_lossy().to_string(),
                retention_hours: 24,
                max_cache_size_mb: 1000,
                sweep_interval_secs: 3600,
            },
            limits: LimitSettings {
                max_upload_bytes: 100 * 1024 * 1024,
                max_video_duration_secs: 120.0,
            },
            processing: ProcessingSettings {
                language: "ar".to_string(),
                segment_duration_secs: 2.0,
                stage_timeout_secs: 60,
                stt_backend: "cadence".to_string(),
                whisper_model_path: None,
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
            },
            realtime: RealtimeSettings {
                session_idle_timeout_secs: 600,
                session_sweep_interval_secs: 60,
            },
        };

        let state = AppState::new(settings).await.expect("build app state");
        spawn_background_tasks(&state);

        let router = build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve test app");
        });

        Self {
            base_url: format!("http://{addr}"),
            ws_url: format!("ws://{addr}"),
            client: reqwest::Client::new(),
            state,
            _upload_dir: upload_dir,
            _cache_dir: cache_dir,
        }
    }

    /// In-memory 16kHz mono WAV of a 220Hz tone.
    pub fn wav_bytes(secs: f64) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            let total = (secs * 16000.0) as usize;
            for i in 0..total {
                let sample =
                    (0.4 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16000.0).sin()
                        * i16::MAX as f32) as i16;
                writer.write_sample(sample).expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.into_inner()
    }

    /// Uploads bytes as a multipart file and returns the parsed response.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .expect("mime");
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("upload request")
    }

    /// Uploads a generated WAV and returns its file id.
    pub async fn upload_wav(&self, secs: f64) -> String {
        let resp = self.upload("clip.wav", Self::wav_bytes(secs)).await;
        assert_eq!(resp.status().as_u16(), 200);
        let json: Value = resp.json().await.expect("upload response json");
        json["file_id"].as_str().expect("file_id").to_string()
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("get request");
        let status = resp.status().as_u16();
        let json: Value = resp.json().await.expect("response json");
        (status, json)
    }

    /// Polls the status endpoint until the pipeline reaches a terminal
    /// state and its run handle is gone, returning the final status body.
    pub async fn wait_terminal(&self, file_id: &str) -> Value {
        for _ in 0..200 {
            let (status, body) = self
                .get_json(&format!("/api/upload/{file_id}/status"))
                .await;
            assert_eq!(status, 200, "status endpoint failed: {body}");
            let state = body["status"].as_str().unwrap_or_default().to_string();
            let terminal = state == "completed" || state == "failed";
            if terminal && body["is_processing"] == false {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("file {file_id} never reached a terminal state");
    }
}
