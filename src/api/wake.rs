//! Wake word detector endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::voice::WakeWordStatus;

use super::{ApiError, ApiState};

/// Build the wake word router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .with_state(state)
}

/// Report detector status
async fn status(State(state): State<Arc<ApiState>>) -> Json<WakeWordStatus> {
    Json(state.detector.status())
}

#[derive(Serialize)]
struct LifecycleResponse {
    running: bool,
}

/// Start the listening thread (no-op when disabled or unconfigured)
async fn start(State(state): State<Arc<ApiState>>) -> Result<Json<LifecycleResponse>, ApiError> {
    state.detector.start().await?;
    Ok(Json(LifecycleResponse {
        running: state.detector.is_running(),
    }))
}

/// Stop the listening thread
async fn stop(State(state): State<Arc<ApiState>>) -> Json<LifecycleResponse> {
    state.detector.stop().await;
    Json(LifecycleResponse {
        running: state.detector.is_running(),
    })
}
