use crate::fixtures::test_app::TestApp;
use sawtfeel_models::{FileKind, ProcessingStatus};
use serde_json::Value;

const EMOTION_LABELS: [&str; 6] = ["anger", "sadness", "joy", "neutral", "fear", "surprise"];

#[tokio::test]
async fn transcript_has_timed_words_within_the_clip() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(10.0).await;
    app.wait_terminal(&file_id).await;

    let (status, body) = app
        .get_json(&format!("/api/processing/{file_id}/transcript"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["file_id"], file_id.as_str());
    assert_eq!(body["language"], "ar");
    assert!(!body["text"].as_str().unwrap().is_empty());
    assert!(body["english_text"].is_string());

    let words = body["words"].as_array().unwrap();
    assert!(!words.is_empty());
    let last_end = words.last().unwrap()["end_time"].as_f64().unwrap();
    assert!(last_end <= 10.0 + 0.01, "last word ends at {last_end}");

    let confidence = body["overall_confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
}

#[tokio::test]
async fn emotions_cover_the_timeline_with_known_labels() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(10.0).await;
    app.wait_terminal(&file_id).await;

    let (status, body) = app
        .get_json(&format!("/api/processing/{file_id}/emotions"))
        .await;
    assert_eq!(status, 200);
    assert!(EMOTION_LABELS.contains(&body["overall_emotion"].as_str().unwrap()));

    let segments = body["segments"].as_array().unwrap();
    assert!(!segments.is_empty());

    let mut previous_end = 0.0;
    for segment in segments {
        let start = segment["start_time"].as_f64().unwrap();
        let end = segment["end_time"].as_f64().unwrap();
        assert!(end > start);
        assert!(start >= previous_end, "segments overlap or run backward");
        previous_end = end;

        for key in ["textual_emotion", "tonal_emotion", "combined_emotion"] {
            assert!(EMOTION_LABELS.contains(&segment[key].as_str().unwrap()));
        }
        for key in [
            "textual_confidence",
            "tonal_confidence",
            "combined_confidence",
        ] {
            let conf = segment[key].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&conf));
        }
    }
}

#[tokio::test]
async fn artifacts_409_while_processing_is_incomplete() {
    let app = TestApp::spawn().await;

    // Seed a stored file without ever starting its pipeline, so its status
    // stays `uploaded` deterministically.
    let file_id = app
        .state
        .store
        .store("pending.wav", FileKind::Audio, "WAV", &TestApp::wav_bytes(1.0))
        .await
        .unwrap();
    app.state
        .store
        .set_status(&file_id, ProcessingStatus::Transcribing)
        .await;

    for endpoint in ["transcript", "emotions"] {
        let (status, body) = app
            .get_json(&format!("/api/processing/{file_id}/{endpoint}"))
            .await;
        assert_eq!(status, 409, "expected conflict for {endpoint}");
        assert!(body["error"].is_string());
        assert_eq!(body["status"], "transcribing");
    }
}

#[tokio::test]
async fn unknown_file_artifacts_are_404() {
    let app = TestApp::spawn().await;
    for endpoint in ["transcript", "emotions"] {
        let (status, body) = app
            .get_json(&format!("/api/processing/no-such-id/{endpoint}"))
            .await;
        assert_eq!(status, 404);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn artifacts_survive_metadata_loss() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(2.0).await;
    app.wait_terminal(&file_id).await;

    // Simulate losing the upload while the cache lives on (restart-style
    // recovery): artifacts must stay readable.
    let path = app.state.store.file_path(&file_id).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    let (status, body) = app
        .get_json(&format!("/api/processing/{file_id}/transcript"))
        .await;
    assert_eq!(status, 200);
    assert!(!body["words"].as_array().unwrap().is_empty());

    let (status, body) = app
        .get_json(&format!("/api/upload/{file_id}/status"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "completed");
}
