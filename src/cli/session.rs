//! CLI handler for session commands.
//!
//! All commands talk to the running service over its HTTP API.

use anyhow::{bail, Context, Result};
use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::api::StartRequest;
use crate::cli::args::{SessionCliArgs, SessionCommand};
use crate::config::Config;
use crate::session::{SessionPhase, SessionSnapshot};

const CONNECT_ERROR: &str = "Failed to connect to recast service. Is it running?";

pub async fn handle_session_command(args: SessionCliArgs) -> Result<()> {
    let config = Config::load()?;
    let client = SessionClient::new(config.api.port);

    match args.command {
        SessionCommand::Start { source_id } => {
            let snapshot = client.start(&source_id).await?;
            println!(
                "Capturing from {} (session {})",
                source_id,
                display_id(&snapshot)
            );
        }
        SessionCommand::Stop { wait } => {
            let snapshot = client.stop(wait).await?;
            print_snapshot(&snapshot);
            if snapshot.state == SessionPhase::Failed {
                bail!("Recording failed");
            }
        }
        SessionCommand::Status => print_snapshot(&client.status().await?),
        SessionCommand::Ack => {
            client.acknowledge().await?;
            println!("Session acknowledged, recorder is idle");
        }
    }

    Ok(())
}

/// Thin HTTP client for the session endpoints.
pub struct SessionClient {
    base_url: String,
    client: reqwest::Client,
}

impl SessionClient {
    pub fn new(port: u16) -> Self {
        Self::with_base_url(format!("http://127.0.0.1:{}", port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn start(&self, source_id: &str) -> Result<SessionSnapshot> {
        let response = self
            .client
            .post(format!("{}/start", self.base_url))
            .json(&StartRequest {
                source_id: source_id.to_string(),
            })
            .send()
            .await
            .context(CONNECT_ERROR)?;
        parse("start recording", response).await
    }

    pub async fn stop(&self, wait: bool) -> Result<SessionSnapshot> {
        let response = self
            .client
            .post(format!("{}/stop", self.base_url))
            .query(&[("wait", wait)])
            .send()
            .await
            .context(CONNECT_ERROR)?;
        parse("stop recording", response).await
    }

    pub async fn status(&self) -> Result<SessionSnapshot> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .context(CONNECT_ERROR)?;
        parse("get status", response).await
    }

    pub async fn acknowledge(&self) -> Result<SessionSnapshot> {
        let response = self
            .client
            .post(format!("{}/acknowledge", self.base_url))
            .send()
            .await
            .context(CONNECT_ERROR)?;
        parse("acknowledge session", response).await
    }
}

async fn parse(action: &str, response: Response) -> Result<SessionSnapshot> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .with_context(|| format!("Invalid response to {}", action));
    }

    let json: Value = response.json().await.unwrap_or(Value::Null);
    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");
    match status {
        StatusCode::CONFLICT => bail!("Cannot {}: {}", action, message),
        _ => bail!("Failed to {}: {}", action, message),
    }
}

fn display_id(snapshot: &SessionSnapshot) -> String {
    snapshot
        .session_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!("State: {}", snapshot.state.as_str());
    if snapshot.session_id.is_none() {
        return;
    }

    println!("Session: {}", display_id(snapshot));
    if let Some(source) = &snapshot.source_id {
        println!("Source: {}", source);
    }
    if let Some(duration) = snapshot.duration_seconds() {
        println!("Duration: {}s", duration);
    }
    println!(
        "Captured: {} chunks, {} bytes",
        snapshot.chunk_count, snapshot.byte_count
    );
    if let Some(path) = &snapshot.container_path {
        println!("Container: {}", path.display());
    }
    if let Some(path) = &snapshot.output_path {
        println!("Output: {}", path.display());
    }
    if let Some(error) = &snapshot.error {
        println!("Error ({}): {}", error.kind.as_str(), error.detail);
    }
}
