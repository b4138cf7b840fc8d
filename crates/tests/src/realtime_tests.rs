use std::time::Duration;

use crate::fixtures::test_app::TestApp;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(app: &TestApp, endpoint: &str, file_id: &str) -> WsStream {
    let (stream, _) = connect_async(format!("{}/ws/{endpoint}/{file_id}", app.ws_url))
        .await
        .expect("ws connect");
    stream
}

async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("ws read timed out")
            .expect("ws closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("ws message json");
        }
    }
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("ws send");
}

/// Reads messages until one of `kinds` arrives, failing on anything else
/// unexpected taking too long.
async fn next_of_kind(ws: &mut WsStream, kinds: &[&str]) -> Value {
    for _ in 0..20 {
        let msg = next_json(ws).await;
        let kind = msg["type"].as_str().unwrap_or_default().to_string();
        if kinds.contains(&kind.as_str()) {
            return msg;
        }
    }
    panic!("never received any of {kinds:?}");
}

#[tokio::test]
async fn playback_connection_greets_with_session() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(4.0).await;
    app.wait_terminal(&file_id).await;

    let mut ws = connect(&app, "playback", &file_id).await;
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    assert_eq!(greeting["file_id"], file_id.as_str());
    assert!(greeting["session_id"].is_string());
    assert!(greeting["timestamp"].is_string());
}

#[tokio::test]
async fn playback_ws_for_unknown_file_is_rejected() {
    let app = TestApp::spawn().await;
    let result = connect_async(format!("{}/ws/playback/no-such-id", app.ws_url)).await;
    assert!(result.is_err(), "upgrade should be refused");
}

#[tokio::test]
async fn time_update_drives_emotion_and_transcript_pushes() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(6.0).await;
    app.wait_terminal(&file_id).await;

    let mut ws = connect(&app, "playback", &file_id).await;
    next_json(&mut ws).await; // connected

    send_json(
        &mut ws,
        json!({ "type": "time_update", "current_time": 1.0, "is_playing": true }),
    )
    .await;

    let echo = next_of_kind(&mut ws, &["time_update"]).await;
    assert_eq!(echo["current_time"], 1.0);
    assert_eq!(echo["is_playing"], true);

    let emotion = next_of_kind(&mut ws, &["emotion_update"]).await;
    assert_eq!(emotion["file_id"], file_id.as_str());
    assert_eq!(emotion["current_time"], 1.0);
    assert!(emotion["emotion"].is_string());
    assert!(emotion["confidence"].as_f64().unwrap() <= 1.0);

    let transcript = next_of_kind(&mut ws, &["transcript_update"]).await;
    assert_eq!(transcript["file_id"], file_id.as_str());
    assert!(transcript["current_word"].is_string());
    // 1.0s into a 0.4s word cadence: the third word is active.
    assert_eq!(transcript["word_index"], 2);
}

#[tokio::test]
async fn cursor_past_the_last_segment_sends_no_emotion_update() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(4.0).await;
    app.wait_terminal(&file_id).await;

    let mut ws = connect(&app, "playback", &file_id).await;
    next_json(&mut ws).await; // connected

    send_json(
        &mut ws,
        json!({ "type": "time_update", "current_time": 999.0, "is_playing": true }),
    )
    .await;
    // Echo comes back, then a transcript update (latest completed word);
    // no emotion update exists past the timeline, so a follow-up ping's
    // pong must be the next message after those.
    next_of_kind(&mut ws, &["time_update"]).await;
    let transcript = next_of_kind(&mut ws, &["transcript_update"]).await;
    assert_eq!(
        transcript["word_index"].as_i64().unwrap(),
        9 // last of ten 0.4s words in a 4s clip
    );

    send_json(&mut ws, json!({ "type": "ping" })).await;
    let next = next_json(&mut ws).await;
    assert_eq!(next["type"], "pong");
}

#[tokio::test]
async fn negative_seek_time_is_rejected() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(2.0).await;
    app.wait_terminal(&file_id).await;

    let mut ws = connect(&app, "playback", &file_id).await;
    next_json(&mut ws).await; // connected

    send_json(
        &mut ws,
        json!({ "type": "time_update", "current_time": -5.0, "is_playing": false }),
    )
    .await;
    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert!(msg["message"].as_str().unwrap().contains("non-negative"));
}

#[tokio::test]
async fn play_pause_and_seek_are_broadcast() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(2.0).await;
    app.wait_terminal(&file_id).await;

    let mut ws = connect(&app, "playback", &file_id).await;
    next_json(&mut ws).await; // connected

    send_json(&mut ws, json!({ "type": "play" })).await;
    let play = next_of_kind(&mut ws, &["play"]).await;
    assert_eq!(play["file_id"], file_id.as_str());

    send_json(&mut ws, json!({ "type": "seek", "time": 1.5 })).await;
    let seek = next_of_kind(&mut ws, &["seek"]).await;
    assert_eq!(seek["time"], 1.5);

    send_json(&mut ws, json!({ "type": "pause" })).await;
    next_of_kind(&mut ws, &["pause"]).await;
}

#[tokio::test]
async fn sessions_on_different_files_never_cross_talk() {
    let app = TestApp::spawn().await;
    let file_a = app.upload_wav(4.0).await;
    app.wait_terminal(&file_a).await;
    let file_b = app.upload_wav(4.0).await;
    app.wait_terminal(&file_b).await;

    let mut ws_a = connect(&app, "playback", &file_a).await;
    next_json(&mut ws_a).await;
    let mut ws_b = connect(&app, "playback", &file_b).await;
    next_json(&mut ws_b).await;

    // Drive file A's cursor; A sees its own updates.
    send_json(
        &mut ws_a,
        json!({ "type": "time_update", "current_time": 1.0, "is_playing": true }),
    )
    .await;
    next_of_kind(&mut ws_a, &["time_update"]).await;

    // B's very next message after a ping must be the pong: nothing from
    // file A ever reached file B's subscriber.
    send_json(&mut ws_b, json!({ "type": "ping" })).await;
    let msg = next_json(&mut ws_b).await;
    assert_eq!(msg["type"], "pong");

    // Registry-side isolation: B's cursor never moved.
    let sessions = app.state.sessions.sessions_for_file(&file_b);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].current_time, 0.0);
}

#[tokio::test]
async fn disconnect_releases_the_playback_session() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(2.0).await;
    app.wait_terminal(&file_id).await;

    let mut ws = connect(&app, "playback", &file_id).await;
    next_json(&mut ws).await;
    assert_eq!(app.state.sessions.len(), 1);

    ws.close(None).await.unwrap();
    // Give the server a moment to run its disconnect cleanup.
    for _ in 0..50 {
        if app.state.sessions.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn processing_ws_streams_status_to_completion() {
    let app = TestApp::spawn().await;
    let file_id = app.upload_wav(4.0).await;

    let mut ws = connect(&app, "processing", &file_id).await;
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    assert_eq!(greeting["file_id"], file_id.as_str());

    // Status flow ends with a completed message. The transition fan-out and
    // the per-connection ticks are independent feeds, so progress is checked
    // monotone within each feed.
    let mut last_status = 0i64;
    let mut last_tick = 0i64;
    loop {
        let msg = next_json(&mut ws).await;
        match msg["type"].as_str().unwrap() {
            "status_update" => {
                if let Some(progress) = msg["progress"].as_i64() {
                    assert!(progress >= last_status);
                    last_status = progress;
                }
            }
            "progress_update" => {
                if let Some(progress) = msg["progress"].as_i64() {
                    assert!(progress >= last_tick);
                    last_tick = progress;
                }
            }
            "completed" => break,
            "error" => panic!("processing failed: {msg}"),
            other => panic!("unexpected message type {other}"),
        }
    }

    // Both status feeds may deliver their own terminal message; skip any
    // stragglers before the pong.
    send_json(&mut ws, json!({ "type": "ping" })).await;
    next_of_kind(&mut ws, &["pong"]).await;
}
