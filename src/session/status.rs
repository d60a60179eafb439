//! Session snapshots and the shared handle that publishes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::machine::SessionPhase;
use crate::error::ErrorReport;

/// What callers see of the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub state: SessionPhase,
    pub source_id: Option<String>,
    pub chunk_count: usize,
    pub byte_count: u64,
    pub container_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub error: Option<ErrorReport>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Seconds since capture started.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Cloneable, read-only view of the coordinator's session state.
#[derive(Clone)]
pub struct SessionStatusHandle {
    inner: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for SessionStatusHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { inner: Arc::new(tx) }
    }
}

impl SessionStatusHandle {
    pub fn get(&self) -> SessionSnapshot {
        self.inner.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.subscribe()
    }

    pub(crate) fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.send_replace(snapshot);
    }
}
