//! Offline handlers: sources, profile and one-shot transcode.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::app;
use crate::cli::args::TranscodeCliArgs;
use crate::config::Config;
use crate::transcode::DELIVERY_PROFILE;

pub async fn handle_transcode_command(args: TranscodeCliArgs) -> Result<()> {
    if !args.input.is_file() {
        bail!("Input file not found: {}", args.input.display());
    }

    let config = Config::load()?;
    let transcoder = app::build_transcoder(&config)?;

    let pb = create_spinner();
    pb.set_message(format!("Converting {}", args.input.display()));

    match transcoder.convert(&args.input).await {
        Ok(output) => {
            pb.finish_with_message("Complete");
            println!("{}", output.display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Failed");
            bail!("{}", e)
        }
    }
}

pub fn handle_sources_command() -> Result<()> {
    let config = Config::load()?;
    let capture = app::build_capture(&config)?;
    let sources = capture.list_sources()?;

    if sources.is_empty() {
        println!(
            "No capture sources found. Put recordings to replay in {}",
            config.capture.replay_dir()?.display()
        );
        return Ok(());
    }

    for source in sources {
        println!("{:<32} {}", source.id, source.display_name);
    }
    Ok(())
}

pub fn handle_profile_command() {
    let profile = DELIVERY_PROFILE;
    println!("Container:   {}", profile.container);
    println!("Video codec: {}", profile.video_codec);
    println!("Audio codec: {}", profile.audio_codec);
    println!("Faststart:   {}", profile.faststart);

    let args: Vec<String> = profile
        .ffmpeg_args(Path::new("<input>"), Path::new("<output>"))
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    println!("\nffmpeg {}", args.join(" "));
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
