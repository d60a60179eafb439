//! Session lifecycle transitions.
//!
//! `next` is a pure function from the current phase and an event to the
//! transition that should happen. The coordinator performs side effects on
//! the edges it returns and nothing else mutates the phase.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Capturing,
    Finalizing,
    Converting,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Finalizing => "finalizing",
            Self::Converting => "converting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Capturing, Finalizing or Converting.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Capturing | Self::Finalizing | Self::Converting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Stop,
    /// The container was written to storage.
    Persisted,
    /// The encoder produced the delivery file.
    Converted,
    /// Any failure on the way: lost capture, empty recording, cancelled
    /// prompt, write error or encoder error.
    Fail,
    Acknowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Move(SessionPhase),
    /// Valid request with nothing to do.
    Stay,
    /// The event is not allowed in this phase.
    Reject,
}

pub fn next(phase: SessionPhase, event: SessionEvent) -> Transition {
    use SessionEvent as E;
    use SessionPhase as P;

    match (phase, event) {
        (P::Idle, E::Start) => Transition::Move(P::Capturing),
        (_, E::Start) => Transition::Reject,

        (P::Capturing, E::Stop) => Transition::Move(P::Finalizing),
        (P::Finalizing | P::Converting | P::Completed | P::Failed, E::Stop) => Transition::Stay,
        (P::Idle, E::Stop) => Transition::Reject,

        (P::Finalizing, E::Persisted) => Transition::Move(P::Converting),
        (P::Converting, E::Converted) => Transition::Move(P::Completed),
        (_, E::Persisted | E::Converted) => Transition::Reject,

        (P::Capturing | P::Finalizing | P::Converting, E::Fail) => Transition::Move(P::Failed),
        (_, E::Fail) => Transition::Reject,

        (P::Completed | P::Failed, E::Acknowledge) => Transition::Move(P::Idle),
        (P::Idle, E::Acknowledge) => Transition::Stay,
        (_, E::Acknowledge) => Transition::Reject,
    }
}
