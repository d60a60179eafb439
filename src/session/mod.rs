//! Recording session: the unit of work from start to acknowledged outcome.
//!
//! A `Session` exists while the coordinator is anywhere but Idle. Its phase
//! only moves through [`machine::next`].

pub mod buffer;
pub mod machine;
pub mod status;

pub use buffer::{Chunk, ChunkBuffer, ChunkSequence};
pub use machine::{SessionEvent, SessionPhase, Transition};
pub use status::{SessionSnapshot, SessionStatusHandle};

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::SessionError;

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    phase: SessionPhase,
    source_id: String,
    buffer: ChunkBuffer,
    chunk_count: usize,
    byte_count: u64,
    container_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    error: Option<SessionError>,
    started_at: DateTime<Utc>,
}

impl Session {
    /// A freshly started session, already Capturing.
    pub fn start(source_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: SessionPhase::Capturing,
            source_id: source_id.into(),
            buffer: ChunkBuffer::new(),
            chunk_count: 0,
            byte_count: 0,
            container_path: None,
            output_path: None,
            error: None,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Run `event` through the transition table and apply a move.
    pub fn fire(&mut self, event: SessionEvent) -> Transition {
        let transition = machine::next(self.phase, event);
        if let Transition::Move(to) = transition {
            self.phase = to;
        }
        transition
    }

    /// Buffer a chunk. Returns `None` unless the session is Capturing.
    pub fn accept_chunk(&mut self, data: Vec<u8>) -> Option<u64> {
        if self.phase != SessionPhase::Capturing {
            return None;
        }
        self.byte_count += data.len() as u64;
        self.chunk_count += 1;
        Some(self.buffer.append(data))
    }

    /// Hand over everything captured so far. Called once, on stop.
    pub fn take_chunks(&mut self) -> ChunkSequence {
        self.buffer.drain()
    }

    pub fn record_container(&mut self, path: PathBuf) {
        self.container_path = Some(path);
    }

    pub fn record_output(&mut self, path: PathBuf) {
        self.output_path = Some(path);
    }

    pub fn record_error(&mut self, error: SessionError) {
        self.error = Some(error);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: Some(self.id),
            state: self.phase,
            source_id: Some(self.source_id.clone()),
            chunk_count: self.chunk_count,
            byte_count: self.byte_count,
            container_path: self.container_path.clone(),
            output_path: self.output_path.clone(),
            error: self.error.as_ref().map(SessionError::report),
            started_at: Some(self.started_at),
        }
    }
}
