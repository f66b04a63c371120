//! Device command endpoints

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::device::{ActionCommand, DiscoveredDevice};

use super::{ApiError, ApiState};

/// Build the device command router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/mode", get(mode))
        .route("/scan", get(scan))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/reset", post(reset))
        .route("/antenna", post(antenna))
        .route("/action", post(action))
        .route("/play-audio", post(play_audio))
        .route("/play-audio-path", post(play_audio_path))
        .route("/random-action", post(random_action))
        .route("/log", get(log))
        .with_state(state)
}

#[derive(Serialize)]
struct ModeResponse {
    mode: &'static str,
    connected: bool,
    address: Option<String>,
}

/// Report link mode and session state
async fn mode(State(state): State<Arc<ApiState>>) -> Json<ModeResponse> {
    let session = state.controller.session().await;
    Json(ModeResponse {
        mode: state.mode.as_str(),
        connected: session.connected,
        address: session.address,
    })
}

#[derive(Serialize)]
struct ScanResponse {
    devices: Vec<DiscoveredDevice>,
}

/// Scan for nearby toys
async fn scan(State(state): State<Arc<ApiState>>) -> Result<Json<ScanResponse>, ApiError> {
    let devices = state.controller.scan().await?;
    Ok(Json(ScanResponse { devices }))
}

#[derive(Deserialize, Default)]
struct ConnectRequest {
    address: Option<String>,
}

#[derive(Serialize)]
struct ConnectResponse {
    connected: bool,
    address: Option<String>,
}

/// Connect to the toy
async fn connect(
    State(state): State<Arc<ApiState>>,
    request: Option<Json<ConnectRequest>>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    state.controller.connect(request.address.as_deref()).await?;

    let session = state.controller.session().await;
    Ok(Json(ConnectResponse {
        connected: session.connected,
        address: session.address,
    }))
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

/// Disconnect from the toy
async fn disconnect(State(state): State<Arc<ApiState>>) -> Result<Json<OkResponse>, ApiError> {
    state.controller.disconnect().await?;
    Ok(Json(OkResponse { ok: true }))
}

/// Force-clear session state
async fn reset(State(state): State<Arc<ApiState>>) -> Result<Json<OkResponse>, ApiError> {
    state.controller.reset().await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct AntennaRequest {
    r: i32,
    g: i32,
    b: i32,
}

/// Set the antenna LED color
async fn antenna(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AntennaRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .controller
        .set_antenna_color(request.r, request.g, request.b)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct ActionRequest {
    input: u8,
    index: u8,
    subindex: u8,
    specific: u8,
}

/// Trigger one built-in action cell
async fn action(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let cmd = ActionCommand::new(
        request.input,
        request.index,
        request.subindex,
        request.specific,
    );
    state.controller.trigger_action(cmd).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// Upload an audio file and play it on the toy
///
/// The multipart body is spooled to a temporary file that is always deleted
/// before the response is produced.
async fn play_audio(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<OkResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidArgument(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload.wav").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::InvalidArgument(format!("failed to read upload: {e}")))?;
            upload = Some((name, data.to_vec()));
        }
    }

    let Some((name, data)) = upload else {
        return Err(Error::InvalidArgument("missing 'file' field".to_string()).into());
    };

    let suffix = PathBuf::from(&name)
        .extension()
        .map_or_else(|| ".wav".to_string(), |e| format!(".{}", e.to_string_lossy()));

    let path = tempfile::Builder::new()
        .prefix("fluff-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(Error::Io)?
        .into_temp_path()
        .keep()
        .map_err(|e| Error::Io(e.error))?;

    let write_result = tokio::fs::write(&path, &data).await;
    let result = match write_result {
        Ok(()) => state.controller.play_audio(&path).await,
        Err(e) => Err(Error::Io(e)),
    };

    if let Err(e) = tokio::fs::remove_file(&path).await {
        state
            .log
            .add(format!("[audio] upload cleanup failed: {e}"));
    }

    result?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct PlayPathRequest {
    path: PathBuf,
}

/// Play an audio file already on the gateway host
async fn play_audio_path(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PlayPathRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state.controller.play_audio(&request.path).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Serialize)]
struct RandomActionResponse {
    input: u8,
    index: u8,
    subindex: u8,
    specific: u8,
}

/// Trigger one random gesture from the curated table
async fn random_action(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<RandomActionResponse>, ApiError> {
    let cmd = state.controller.random_action().await?;
    Ok(Json(RandomActionResponse {
        input: cmd.input,
        index: cmd.index,
        subindex: cmd.subindex,
        specific: cmd.specific,
    }))
}

#[derive(Serialize)]
struct LogResponse {
    lines: Vec<String>,
}

/// Dump the recent event log
async fn log(State(state): State<Arc<ApiState>>) -> Json<LogResponse> {
    Json(LogResponse {
        lines: state.log.dump(),
    })
}
