//! REST API server for recast.
//!
//! Provides HTTP endpoints for:
//! - Session control (start, stop, acknowledge, status)
//! - Capture source listing
//! - Encode profile inspection

pub mod error;
pub mod routes;

use crate::capture::CaptureProvider;
use crate::coordinator::RecorderHandle;
use crate::transcode::EncodeProfile;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::capture::CaptureState;
pub use routes::session::{SessionState, StartRequest};

pub struct ApiServer {
    port: u16,
    session_state: SessionState,
    capture_state: CaptureState,
}

impl ApiServer {
    pub fn new(
        recorder: RecorderHandle,
        provider: Arc<dyn CaptureProvider>,
        profile: EncodeProfile,
        port: u16,
    ) -> Self {
        Self {
            port,
            session_state: SessionState { recorder },
            capture_state: CaptureState { provider, profile },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::session::router(self.session_state.clone()))
            .merge(routes::capture::router(self.capture_state.clone()))
            .layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = self.router();
        let addr = listener.local_addr()?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET  /              - Service info");
        info!("  GET  /version       - Get version info");
        info!("  GET  /status        - Current session snapshot");
        info!("  POST /start         - Start capturing {{source_id}}");
        info!("  POST /stop?wait=    - Stop and finalize the session");
        info!("  POST /acknowledge   - Return a finished session to idle");
        info!("  GET  /sources       - List capture sources");
        info!("  GET  /profile       - Encode profile and ffmpeg arguments");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "recast",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "recast"
    }))
}
