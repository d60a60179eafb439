use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recast")]
#[command(about = "Record a capture source and deliver it as MP4", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Control the recording session of the running service
    Session(SessionCliArgs),
    /// List capture sources available to the service
    Sources,
    /// Show the delivery encode profile and the ffmpeg arguments it uses
    Profile,
    /// Convert a recorded container with the delivery profile
    Transcode(TranscodeCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SessionCliArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Start capturing from a source (see `recast sources`)
    Start {
        /// Source id, e.g. file:demo.webm
        source_id: String,
    },
    /// Stop capturing and convert the recording
    Stop {
        /// Wait for the conversion to finish
        #[arg(short, long)]
        wait: bool,
    },
    /// Show the current session
    Status,
    /// Return a finished session to idle
    Ack,
}

#[derive(ClapArgs, Debug)]
pub struct TranscodeCliArgs {
    /// Container to convert
    pub input: PathBuf,
}
