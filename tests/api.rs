//! API endpoint integration tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tokio::sync::mpsc;
use tower::ServiceExt;

use fluff_gateway::EventLog;
use fluff_gateway::api::{ApiState, router};
use fluff_gateway::config::WakeConfig;
use fluff_gateway::device::{DeviceController, LinkMode, SimulatedLink};
use fluff_gateway::voice::{TurnRequest, WakeWordDetector};

/// Build a test router over the simulated link
fn build_test_router() -> (axum::Router, mpsc::Receiver<TurnRequest>) {
    let log = EventLog::default();
    let controller = Arc::new(DeviceController::new(
        Arc::new(SimulatedLink::new(log.clone())),
        LinkMode::Simulated,
        None,
        log.clone(),
    ));

    let (turn_tx, turn_rx) = mpsc::channel(1);
    let detector = Arc::new(WakeWordDetector::new(
        WakeConfig::default(),
        false,
        turn_tx,
        log.clone(),
    ));

    let state = Arc::new(ApiState {
        controller,
        detector,
        log,
        mode: LinkMode::Simulated,
    });

    (router(state), turn_rx)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn mode_reports_simulated_and_disconnected() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(Request::builder().uri("/api/mode").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["mode"], "simulated");
    assert_eq!(json["connected"], false);
}

#[tokio::test]
async fn scan_returns_the_simulated_toy() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(Request::builder().uri("/api/scan").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["devices"][0]["name"], "Furby Simulado");
    assert_eq!(json["devices"][0]["address"], "FA:KE:FU:RB:YY:00");
}

#[tokio::test]
async fn antenna_rejects_out_of_range_channel() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/antenna")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"r":300,"g":0,"b":0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "invalid_argument");
}

#[tokio::test]
async fn connect_then_mode_shows_session() {
    let (app, _rx) = build_test_router();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/connect")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"address":"AA:BB:CC:DD:EE:FF"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/api/mode").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["connected"], true);
    assert_eq!(json["address"], "AA:BB:CC:DD:EE:FF");
}

#[tokio::test]
async fn play_audio_path_missing_file_is_404() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/play-audio-path")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"path":"/nonexistent/clip.wav"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn log_dump_reflects_device_activity() {
    let (app, _rx) = build_test_router();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/scan").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/api/log").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let lines = json["lines"].as_array().unwrap();
    assert!(
        lines
            .iter()
            .any(|l| l.as_str().unwrap_or_default().starts_with("[scan]"))
    );
}

#[tokio::test]
async fn wake_word_status_reports_disabled() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/wake-word/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["enabled"], false);
    assert_eq!(json["running"], false);
}

#[tokio::test]
async fn wake_word_start_is_noop_when_disabled() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/wake-word/start")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["running"], false);
}

#[tokio::test]
async fn random_action_returns_the_chosen_tuple() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/random-action")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["input"].is_u64());
    assert!(json["specific"].is_u64());
}

#[tokio::test]
async fn index_serves_the_control_page() {
    let (app, _rx) = build_test_router();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Fluff Gateway"));
}
