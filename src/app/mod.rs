use crate::api::ApiServer;
use crate::capture::{CaptureProvider, ReplayCaptureProvider};
use crate::config::{Config, SavePromptMode};
use crate::coordinator::{Coordinator, Finalizer, RecorderHandle};
use crate::storage::{DirectorySavePrompt, InteractiveSavePrompt, SavePrompt};
use crate::transcode::{FfmpegEncoder, TranscodePipeline};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

pub async fn run_service() -> Result<()> {
    info!("Starting recast service");

    let config = Config::load()?;

    let capture = build_capture(&config)?;
    let transcoder = build_transcoder(&config)?;
    let profile = *transcoder.profile();
    let recorder = build_recorder(&config, capture.clone(), transcoder)?;

    let api_server = ApiServer::new(recorder.clone(), capture, profile, config.api.port);
    let server = tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    let port = config.api.port;
    info!("recast is ready!");
    info!("List sources: curl http://127.0.0.1:{}/sources", port);
    info!(
        "Start: curl -X POST -H 'content-type: application/json' -d '{{\"source_id\":\"file:demo.webm\"}}' http://127.0.0.1:{}/start",
        port
    );
    info!("Stop:  curl -X POST 'http://127.0.0.1:{}/stop?wait=true'", port);

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    let snapshot = recorder.snapshot();
    if snapshot.state.is_active() {
        info!("Abandoning session in state {}", snapshot.state.as_str());
    }

    Ok(())
}

pub fn build_capture(config: &Config) -> Result<Arc<dyn CaptureProvider>> {
    let dir = config.capture.replay_dir()?;
    Ok(Arc::new(ReplayCaptureProvider::new(
        dir,
        config.capture.chunk_size,
        config.capture.chunk_interval(),
    )))
}

pub fn build_transcoder(config: &Config) -> Result<TranscodePipeline> {
    let encoder = FfmpegEncoder::locate(config.encoder.ffmpeg_path())?
        .with_timeout(config.encoder.timeout());
    info!("Using ffmpeg at {:?}", encoder.binary());
    Ok(TranscodePipeline::new(Arc::new(encoder)))
}

pub fn build_prompt(config: &Config) -> Result<Arc<dyn SavePrompt>> {
    let dir = config.recording.output_dir()?;
    Ok(match config.recording.save_prompt {
        SavePromptMode::Auto => Arc::new(DirectorySavePrompt::new(dir)),
        SavePromptMode::Interactive => Arc::new(InteractiveSavePrompt::new(dir)),
    })
}

pub fn build_recorder(
    config: &Config,
    capture: Arc<dyn CaptureProvider>,
    transcoder: TranscodePipeline,
) -> Result<RecorderHandle> {
    let finalizer = Finalizer::new(build_prompt(config)?, transcoder)
        .with_retention(config.recording.retention)
        .with_file_prefix(config.recording.file_prefix.clone());

    Ok(Coordinator::new(capture, finalizer)
        .with_chunk_queue(config.recording.chunk_queue_capacity)
        .spawn())
}
