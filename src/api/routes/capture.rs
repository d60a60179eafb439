//! Capture source and encode profile endpoints.

use crate::api::error::{ApiError, ApiResult};
use crate::capture::{CaptureProvider, SourceInfo};
use crate::transcode::EncodeProfile;
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct CaptureState {
    pub provider: Arc<dyn CaptureProvider>,
    pub profile: EncodeProfile,
}

pub fn router(state: CaptureState) -> Router {
    Router::new()
        .route("/sources", get(list_sources))
        .route("/profile", get(encode_profile))
        .with_state(state)
}

async fn list_sources(State(state): State<CaptureState>) -> ApiResult<Json<Vec<SourceInfo>>> {
    let sources = state.provider.list_sources().map_err(ApiError::from)?;
    Ok(Json(sources))
}

async fn encode_profile(State(state): State<CaptureState>) -> Json<Value> {
    let args: Vec<String> = state
        .profile
        .ffmpeg_args(Path::new("<input>"), Path::new("<output>"))
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    Json(json!({
        "profile": state.profile,
        "ffmpeg_args": args,
    }))
}
