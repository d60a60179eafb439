//! Conversion of raw containers into the delivery format.
//!
//! The encoder itself is a blocking call; [`TranscodePipeline`] runs it on
//! a dedicated worker so the coordinator never stalls on it.

pub mod ffmpeg;
pub mod profile;

pub use ffmpeg::FfmpegEncoder;
pub use profile::{EncodeProfile, DELIVERY_PROFILE};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeFailure {
    /// The encoder's own message, passed through untouched.
    #[error("{0}")]
    Diagnostic(String),

    #[error("timed out after {0}s")]
    TimedOut(u64),

    #[error("failed to launch encoder: {0}")]
    Launch(String),
}

/// An external encoding process.
pub trait Encoder: Send + Sync {
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Result<(), EncodeFailure>;
}

/// Output location for a container: same directory and base name, delivery
/// extension. An input that already has the delivery extension gets a
/// `-converted` suffix so input and output never coincide.
pub fn derive_output_path(input: &Path, profile: &EncodeProfile) -> PathBuf {
    let output = input.with_extension(profile.extension);
    if output != input {
        return output;
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    input.with_file_name(format!("{}-converted.{}", stem, profile.extension))
}

#[derive(Clone)]
pub struct TranscodePipeline {
    encoder: Arc<dyn Encoder>,
    profile: EncodeProfile,
}

impl TranscodePipeline {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self {
            encoder,
            profile: DELIVERY_PROFILE,
        }
    }

    pub fn profile(&self) -> &EncodeProfile {
        &self.profile
    }

    /// Convert `container` once. The container itself is never modified.
    pub async fn convert(&self, container: &Path) -> Result<PathBuf, SessionError> {
        let input = container.to_path_buf();
        let output = derive_output_path(container, &self.profile);
        info!("Converting {:?} -> {:?}", input, output);

        let encoder = Arc::clone(&self.encoder);
        let profile = self.profile;
        let target = output.clone();
        let result = tokio::task::spawn_blocking(move || encoder.encode(&input, &target, &profile))
            .await
            .map_err(|e| SessionError::Transcode(format!("encoder worker failed: {e}")))?;

        match result {
            Ok(()) => {
                info!("Conversion complete: {:?}", output);
                Ok(output)
            }
            Err(failure) => {
                error!("Conversion of {:?} failed: {}", container, failure);
                Err(SessionError::Transcode(failure.to_string()))
            }
        }
    }
}
