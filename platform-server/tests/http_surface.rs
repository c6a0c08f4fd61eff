//! End-to-end tests driving the real `Router` in process via
//! `tower::ServiceExt::oneshot` against a throwaway data dir.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use platform_core::config::Config;
use platform_core::Platform;
use platform_server::routes;
use platform_server::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        concurrent_login_lock: Duration::from_secs(0),
        ..Config::default()
    };
    let platform = Platform::open(config).unwrap();
    let state = AppState(Arc::new(platform));
    (routes::router(state), dir)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// A minimal zip with a `manifest.json` declaring a 2-4 player game with a
/// server-run entry, matching `platform_core::artifact`'s schema.
fn valid_bundle_base64() -> String {
    use std::io::Write as _;
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options =
            zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("manifest.json", options).unwrap();
        writer
            .write_all(br#"{"entry":"main.py","server_entry":"server.py","min_players":2,"max_players":4}"#)
            .unwrap();
        writer.start_file("main.py", options).unwrap();
        writer.write_all(b"print('hi')").unwrap();
        writer.start_file("server.py", options).unwrap();
        writer.write_all(b"print('serve')").unwrap();
        writer.finish().unwrap();
    }
    base64::engine::general_purpose::STANDARD.encode(buf)
}

#[tokio::test]
async fn register_then_login_then_heartbeat_round_trip() {
    let (app, _dir) = test_app();

    let (status, body) = call(
        &app,
        "POST",
        "/player/register",
        Some(json!({"username": "alice", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));

    let (status, _) = call(
        &app,
        "POST",
        "/player/register",
        Some(json!({"username": "alice", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/player/login",
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/player/login",
        Some(json!({"username": "alice", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "POST", "/player/heartbeat", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "POST", "/player/logout", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "POST", "/player/heartbeat", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_game_then_list_and_fetch() {
    let (app, _dir) = test_app();
    call(&app, "POST", "/dev/register", Some(json!({"username": "carol", "password": "pw"}))).await;
    call(&app, "POST", "/dev/login", Some(json!({"username": "carol", "password": "pw"}))).await;

    let (status, body) = call(
        &app,
        "POST",
        "/games",
        Some(json!({
            "developer": "carol",
            "name": "Dice Duel",
            "description": "roll off",
            "version": "1.0.0",
            "file_data": valid_bundle_base64(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let game_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["min_players"], json!(2));

    let (status, body) = call(&app, "GET", "/games", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "GET", &format!("/games/{game_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(game_id));

    let (status, _) = call(&app, "GET", &format!("/games/{game_id}/integrity"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn room_lifecycle_rejects_start_below_min_players() {
    let (app, _dir) = test_app();
    call(&app, "POST", "/dev/register", Some(json!({"username": "carol", "password": "pw"}))).await;
    call(&app, "POST", "/dev/login", Some(json!({"username": "carol", "password": "pw"}))).await;
    let (_, body) = call(
        &app,
        "POST",
        "/games",
        Some(json!({
            "developer": "carol",
            "name": "Dice Duel",
            "description": "",
            "version": "1.0.0",
            "file_data": valid_bundle_base64(),
        })),
    )
    .await;
    let game_id = body["data"]["id"].as_str().unwrap().to_string();

    call(&app, "POST", "/player/register", Some(json!({"username": "alice", "password": "pw"}))).await;
    call(&app, "POST", "/player/login", Some(json!({"username": "alice", "password": "pw"}))).await;

    let (status, body) = call(&app, "POST", "/rooms", Some(json!({"player": "alice", "game_id": game_id}))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let room_id = body["data"]["id"].as_u64().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/rooms/{room_id}/start"),
        Some(json!({"player": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["success"], json!(false));

    let (status, _) = call(
        &app,
        "POST",
        &format!("/rooms/{room_id}/leave"),
        Some(json!({"player": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rating_requires_login() {
    let (app, _dir) = test_app();
    let (status, _) = call(
        &app,
        "POST",
        "/ratings",
        Some(json!({"player": "ghost", "game_id": "dice", "score": 5, "comment": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
