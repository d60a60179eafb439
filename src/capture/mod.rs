//! Capture provider abstraction.
//!
//! Providers deliver encoded media into a [`ChunkSink`]; the coordinator owns
//! the receiving end. Pushing never suspends, so providers can call it from
//! any callback or thread.

pub mod replay;

pub use replay::ReplayCaptureProvider;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SessionError;

/// A selectable screen, window or other source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Chunk(Vec<u8>),
    /// The source died mid-capture.
    Lost(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_id}: {reason}")]
pub struct SourceUnavailable {
    pub source_id: String,
    pub reason: String,
}

impl From<SourceUnavailable> for SessionError {
    fn from(err: SourceUnavailable) -> Self {
        SessionError::SourceUnavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("chunk queue is full")]
    Full,
    #[error("session is no longer capturing")]
    Closed,
}

/// Producer side of a session's chunk queue.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    tx: mpsc::Sender<CaptureEvent>,
}

impl ChunkSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CaptureEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn push(&self, data: Vec<u8>) -> Result<(), SinkError> {
        self.send(CaptureEvent::Chunk(data))
    }

    pub fn report_lost(&self, reason: impl Into<String>) -> Result<(), SinkError> {
        self.send(CaptureEvent::Lost(reason.into()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: CaptureEvent) -> Result<(), SinkError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// A running capture. Stopping flushes nothing further into the sink.
pub trait CaptureStream: Send {
    fn stop(&mut self);
}

#[async_trait]
pub trait CaptureProvider: Send + Sync {
    fn list_sources(&self) -> Result<Vec<SourceInfo>>;

    async fn open(
        &self,
        source_id: &str,
        sink: ChunkSink,
    ) -> Result<Box<dyn CaptureStream>, SourceUnavailable>;
}
