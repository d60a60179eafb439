//! Stop-time pipeline: save prompt → container write → transcode → retention.
//!
//! This is the only code that calls both the writer and the transcoder, and
//! the transcoder only ever sees a container whose write returned Ok.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::ChunkSequence;
use crate::storage::{
    suggested_file_name, ContainerWriter, ExtensionFilter, RetentionPolicy, SaveChoice, SavePrompt,
};
use crate::transcode::TranscodePipeline;

/// Edge results reported back to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Persisted { session_id: Uuid, path: PathBuf },
    Converted { session_id: Uuid, path: PathBuf },
    Failed { session_id: Uuid, error: SessionError },
}

pub struct Finalizer {
    prompt: Arc<dyn SavePrompt>,
    writer: ContainerWriter,
    transcoder: TranscodePipeline,
    retention: RetentionPolicy,
    file_prefix: String,
}

impl Finalizer {
    pub fn new(prompt: Arc<dyn SavePrompt>, transcoder: TranscodePipeline) -> Self {
        Self {
            prompt,
            writer: ContainerWriter::new(),
            transcoder,
            retention: RetentionPolicy::default(),
            file_prefix: "recording".to_string(),
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Drive one stopped session to its outcome. Every edge is reported on
    /// `events`; the returned result mirrors the final event.
    pub async fn finalize_session(
        &self,
        session_id: Uuid,
        chunks: ChunkSequence,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> Result<PathBuf, SessionError> {
        let result = self.run(session_id, chunks, events).await;

        match &result {
            Ok(output) => {
                info!("Session {} completed: {:?}", session_id, output);
                let _ = events
                    .send(PipelineEvent::Converted {
                        session_id,
                        path: output.clone(),
                    })
                    .await;
            }
            Err(error) => {
                error!("Session {} failed: {}", session_id, error);
                let _ = events
                    .send(PipelineEvent::Failed {
                        session_id,
                        error: error.clone(),
                    })
                    .await;
            }
        }

        result
    }

    async fn run(
        &self,
        session_id: Uuid,
        chunks: ChunkSequence,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> Result<PathBuf, SessionError> {
        if chunks.is_empty() {
            return Err(SessionError::EmptyRecording(
                "no media was captured before stop".to_string(),
            ));
        }

        let filter = ExtensionFilter::webm();
        let suggested = suggested_file_name(&self.file_prefix, &filter);
        let container = match self.prompt.prompt_save_path(&suggested, &filter).await {
            Ok(SaveChoice::Path(path)) => path,
            Ok(SaveChoice::Cancelled) => {
                return Err(SessionError::UserCancelled(
                    "save location was not chosen".to_string(),
                ))
            }
            Err(e) => return Err(SessionError::Io(format!("{e:#}"))),
        };

        self.writer.write(&container, chunks).await?;
        let _ = events
            .send(PipelineEvent::Persisted {
                session_id,
                path: container.clone(),
            })
            .await;

        let output = self.transcoder.convert(&container).await?;
        self.retention.apply(&container).await;

        Ok(output)
    }
}
