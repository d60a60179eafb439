pub mod args;
pub mod session;
pub mod transcode;

pub use args::{Cli, CliCommand, SessionCliArgs, SessionCommand, TranscodeCliArgs};
pub use session::{handle_session_command, SessionClient};
pub use transcode::{handle_profile_command, handle_sources_command, handle_transcode_command};
