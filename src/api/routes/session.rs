//! Session control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting a session (POST /start)
//! - Stopping a session (POST /stop)
//! - Acknowledging a finished session (POST /acknowledge)
//! - Getting the current snapshot (GET /status)

use crate::api::error::ApiResult;
use crate::coordinator::RecorderHandle;
use crate::session::SessionSnapshot;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub source_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StopParams {
    /// Hold the response until the session is Completed or Failed.
    #[serde(default)]
    pub wait: bool,
}

#[derive(Clone)]
pub struct SessionState {
    pub recorder: RecorderHandle,
}

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/start", post(start_session))
        .route("/stop", post(stop_session))
        .route("/acknowledge", post(acknowledge_session))
        .route("/status", get(session_status))
        .with_state(state)
}

async fn start_session(
    State(state): State<SessionState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    info!("Start requested via API for {}", request.source_id);
    let snapshot = state.recorder.start(request.source_id).await?;
    Ok(Json(snapshot))
}

/// Stops capturing. Without `wait` the response carries the Finalizing
/// snapshot; with it, the terminal snapshot (including any failure report).
async fn stop_session(
    State(state): State<SessionState>,
    Query(params): Query<StopParams>,
) -> ApiResult<Json<SessionSnapshot>> {
    info!("Stop requested via API (wait: {})", params.wait);
    let completion = state.recorder.stop().await?;

    if params.wait {
        if let Err(e) = completion.wait().await {
            warn!("Session finished with error: {}", e);
        }
    }

    Ok(Json(state.recorder.snapshot()))
}

async fn acknowledge_session(State(state): State<SessionState>) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = state.recorder.acknowledge().await?;
    Ok(Json(snapshot))
}

async fn session_status(State(state): State<SessionState>) -> Json<SessionSnapshot> {
    Json(state.recorder.snapshot())
}
