use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn wav_upload_processes_to_completion() {
    let app = TestApp::spawn().await;

    let resp = app.upload("clip.wav", TestApp::wav_bytes(10.0)).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "uploaded");
    let file_id = body["file_id"].as_str().unwrap().to_string();

    let final_status = app.wait_terminal(&file_id).await;
    assert_eq!(final_status["status"], "completed");
    assert_eq!(final_status["progress"], 100);
    assert_eq!(final_status["is_processing"], false);
}

#[tokio::test]
async fn status_progress_is_monotone_while_processing() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(6.0).await;

    let mut last = 0i64;
    loop {
        let (status, body) = app.get_json(&format!("/api/upload/{file_id}/status")).await;
        assert_eq!(status, 200);
        let progress = body["progress"].as_i64().unwrap();
        assert!(
            progress >= last,
            "progress went backward: {last} -> {progress}"
        );
        last = progress;
        let state = body["status"].as_str().unwrap();
        if state == "completed" || state == "failed" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(last, 100);
}

#[tokio::test]
async fn unsupported_extension_is_rejected_with_format_list() {
    let app = TestApp::spawn().await;

    let resp = app.upload("notes.txt", b"plain text".to_vec()).await;
    assert_eq!(resp.status().as_u16(), 415);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Unsupported"));
    let formats: Vec<&str> = body["supported_formats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(formats.contains(&"WAV"));
    assert!(formats.contains(&"MP4"));
}

#[tokio::test]
async fn missing_filename_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let part = reqwest::multipart::Part::bytes(b"data".to_vec());
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_file_status_is_404() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get_json("/api/upload/no-such-id/status").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn uploaded_files_are_listed_newest_first() {
    let app = TestApp::spawn().await;
    let first = app.upload_wav(1.0).await;
    app.wait_terminal(&first).await;
    let second = app.upload_wav(1.0).await;
    app.wait_terminal(&second).await;

    let (status, body) = app.get_json("/api/upload/files").await;
    assert_eq!(status, 200);
    assert_eq!(body["total_count"], 2);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files[0]["file_id"], second.as_str());
    assert_eq!(files[1]["file_id"], first.as_str());
    assert_eq!(files[0]["file_type"], "audio");
}

#[tokio::test]
async fn delete_removes_file_and_cached_artifacts() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(2.0).await;
    app.wait_terminal(&file_id).await;

    let resp = app
        .client
        .delete(format!("{}/api/upload/{file_id}", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let deleted: Vec<&str> = body["deleted_items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(deleted.contains(&"disk"));
    assert!(deleted.contains(&"cache"));

    // Gone everywhere afterwards.
    let (status, _) = app.get_json(&format!("/api/upload/{file_id}/status")).await;
    assert_eq!(status, 404);
    let (status, _) = app
        .get_json(&format!("/api/processing/{file_id}/transcript"))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get_json("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}
