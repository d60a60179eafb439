//! Single completion signal for a stopped session.

use std::path::PathBuf;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::{SessionPhase, SessionSnapshot};

/// Resolves once the session it was issued for reaches Completed or Failed.
#[derive(Debug)]
pub struct Completion {
    session_id: Uuid,
    state: SessionPhase,
    rx: watch::Receiver<SessionSnapshot>,
}

impl Completion {
    pub(crate) fn new(
        session_id: Uuid,
        state: SessionPhase,
        rx: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            session_id,
            state,
            rx,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Phase of the session when stop returned.
    pub fn state(&self) -> SessionPhase {
        self.state
    }

    /// Wait for the outcome: the delivery file path or the failure.
    pub async fn wait(mut self) -> Result<PathBuf, SessionError> {
        loop {
            {
                let snapshot = self.rx.borrow_and_update();
                if snapshot.session_id != Some(self.session_id) {
                    return Err(SessionError::InvalidState(format!(
                        "session {} was acknowledged before its outcome was observed",
                        self.session_id
                    )));
                }

                match snapshot.state {
                    SessionPhase::Completed => {
                        return snapshot.output_path.clone().ok_or_else(|| {
                            SessionError::InvalidState(
                                "completed session has no output path".to_string(),
                            )
                        });
                    }
                    SessionPhase::Failed => {
                        return Err(snapshot.error.clone().map(SessionError::from).unwrap_or_else(
                            || SessionError::InvalidState("session failed without a report".to_string()),
                        ));
                    }
                    _ => {}
                }
            }

            if self.rx.changed().await.is_err() {
                return Err(SessionError::InvalidState(
                    "recorder shut down before the session finished".to_string(),
                ));
            }
        }
    }
}
