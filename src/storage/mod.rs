//! Persistence of captured recordings.
//!
//! - `writer`: atomic container writes
//! - `prompt`: where a recording is saved
//! - [`RetentionPolicy`]: what happens to the raw container after conversion

pub mod prompt;
pub mod writer;

pub use prompt::{
    suggested_file_name, DirectorySavePrompt, ExtensionFilter, InteractiveSavePrompt, SaveChoice,
    SavePrompt,
};
pub use writer::ContainerWriter;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Fate of the raw container once the delivery file exists. Failed sessions
/// always keep it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    #[default]
    Keep,
    DeleteOnSuccess,
}

impl RetentionPolicy {
    /// Apply the policy to a successfully converted container. Returns
    /// whether the file was removed. Removal errors are logged only.
    pub async fn apply(&self, container: &Path) -> bool {
        match self {
            Self::Keep => false,
            Self::DeleteOnSuccess => match tokio::fs::remove_file(container).await {
                Ok(()) => {
                    debug!("Deleted raw container {:?}", container);
                    true
                }
                Err(e) => {
                    warn!("Failed to delete raw container {:?}: {}", container, e);
                    false
                }
            },
        }
    }
}
