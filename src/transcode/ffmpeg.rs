//! FFmpeg-backed encoder.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::profile::EncodeProfile;
use super::{EncodeFailure, Encoder};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the ffmpeg binary synchronously. Meant to be called on a blocking
/// worker thread.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Use `configured` when given, otherwise find `ffmpeg` on PATH.
    pub fn locate(configured: Option<&str>) -> Result<Self> {
        if let Some(path) = configured.filter(|p| !p.trim().is_empty()) {
            return Ok(Self::new(path));
        }

        let binary = which::which("ffmpeg").context(
            "FFmpeg is required to convert recordings but was not found.\n\
             Install FFmpeg:\n\
             - macOS: brew install ffmpeg\n\
             - Ubuntu/Debian: sudo apt install ffmpeg\n\
             - Arch: sudo pacman -S ffmpeg\n\
             - Windows: winget install ffmpeg",
        )?;
        debug!("Found ffmpeg at {:?}", binary);
        Ok(Self::new(binary))
    }

    /// Kill the encoder if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, EncodeFailure> {
        let Some(timeout) = self.timeout else {
            return child
                .wait()
                .map_err(|e| EncodeFailure::Launch(e.to_string()));
        };

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(
                        "ffmpeg still running after {}s, killing it",
                        timeout.as_secs()
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EncodeFailure::TimedOut(timeout.as_secs()));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(EncodeFailure::Launch(e.to_string())),
            }
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Result<(), EncodeFailure> {
        let result = self.run(input, output, profile);
        if let Err(EncodeFailure::Diagnostic(_) | EncodeFailure::TimedOut(_)) = &result {
            discard_partial_output(output);
        }
        result
    }
}

/// A failed or killed ffmpeg may leave a truncated file behind.
fn discard_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => debug!("Removed partial output {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {:?}: {}", output, e),
    }
}

impl FfmpegEncoder {
    fn run(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Result<(), EncodeFailure> {
        info!("Running ffmpeg: {:?} -> {:?}", input, output);

        let mut child = Command::new(&self.binary)
            .args(profile.ffmpeg_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncodeFailure::Launch(format!("{}: {}", self.binary.display(), e)))?;

        // A full stderr pipe stalls the child, so drain it concurrently.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let status = self.wait(&mut child);
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let status = status?;

        if !status.success() {
            let diagnostic = stderr.trim();
            return Err(EncodeFailure::Diagnostic(if diagnostic.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                diagnostic.to_string()
            }));
        }

        if !output.exists() {
            return Err(EncodeFailure::Diagnostic(
                "ffmpeg did not produce output file".to_string(),
            ));
        }

        Ok(())
    }
}
