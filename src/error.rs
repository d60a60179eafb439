//! Typed failures for the recording session lifecycle.
//!
//! Every failure a session can hit maps to one `SessionError` variant. The
//! variant survives into the terminal `Failed` snapshot as an
//! [`ErrorReport`] so callers always see the kind and the detail.

use serde::{Deserialize, Serialize};

/// Failure kinds a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidState,
    SourceUnavailable,
    EmptyRecording,
    UserCancelled,
    IoError,
    TranscodeError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidState => "invalid_state",
            Self::SourceUnavailable => "source_unavailable",
            Self::EmptyRecording => "empty_recording",
            Self::UserCancelled => "user_cancelled",
            Self::IoError => "io_error",
            Self::TranscodeError => "transcode_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Empty recording: {0}")]
    EmptyRecording(String),

    #[error("Cancelled: {0}")]
    UserCancelled(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Self::EmptyRecording(_) => ErrorKind::EmptyRecording,
            Self::UserCancelled(_) => ErrorKind::UserCancelled,
            Self::Io(_) => ErrorKind::IoError,
            Self::Transcode(_) => ErrorKind::TranscodeError,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidState(detail)
            | Self::SourceUnavailable(detail)
            | Self::EmptyRecording(detail)
            | Self::UserCancelled(detail)
            | Self::Io(detail)
            | Self::Transcode(detail) => detail,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            detail: self.detail().to_string(),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Serialisable form of a [`SessionError`] carried by snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<ErrorReport> for SessionError {
    fn from(report: ErrorReport) -> Self {
        let detail = report.detail;
        match report.kind {
            ErrorKind::InvalidState => Self::InvalidState(detail),
            ErrorKind::SourceUnavailable => Self::SourceUnavailable(detail),
            ErrorKind::EmptyRecording => Self::EmptyRecording(detail),
            ErrorKind::UserCancelled => Self::UserCancelled(detail),
            ErrorKind::IoError => Self::Io(detail),
            ErrorKind::TranscodeError => Self::Transcode(detail),
        }
    }
}
