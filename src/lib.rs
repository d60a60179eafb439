pub mod api;
pub mod app;
pub mod capture;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod global;
pub mod session;
pub mod storage;
pub mod transcode;

pub use coordinator::{Completion, Coordinator, RecorderHandle};
pub use error::{ErrorKind, SessionError};
pub use session::{SessionPhase, SessionSnapshot};
