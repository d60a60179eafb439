//! Save-location prompts.
//!
//! The coordinator asks once per session, when capture stops, where the raw
//! container should go. A prompt answers with a path or a cancellation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name and extension a prompt should restrict the destination to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    pub name: String,
    pub extension: String,
}

impl ExtensionFilter {
    pub fn webm() -> Self {
        Self {
            name: "WebM video".to_string(),
            extension: "webm".to_string(),
        }
    }

    /// Append the filter's extension when `path` has none.
    pub fn apply(&self, path: PathBuf) -> PathBuf {
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(&self.extension)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveChoice {
    Path(PathBuf),
    Cancelled,
}

#[async_trait]
pub trait SavePrompt: Send + Sync {
    async fn prompt_save_path(
        &self,
        suggested_name: &str,
        filter: &ExtensionFilter,
    ) -> Result<SaveChoice>;
}

/// `<prefix>-YYYYmmdd-HHMMSS.<ext>` in local time.
pub fn suggested_file_name(prefix: &str, filter: &ExtensionFilter) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    format!("{}-{}.{}", prefix, timestamp, filter.extension)
}

/// Non-interactive prompt that always saves into one directory.
pub struct DirectorySavePrompt {
    dir: PathBuf,
}

impl DirectorySavePrompt {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn available_path(&self, file_name: &str) -> PathBuf {
        let path = self.dir.join(file_name);
        if !path.exists() {
            return path;
        }

        let name = Path::new(file_name);
        let stem = name
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("recording");
        let ext = name.extension().and_then(|s| s.to_str());

        for i in 1..100 {
            let candidate = match ext {
                Some(ext) => format!("{}-{}.{}", stem, i, ext),
                None => format!("{}-{}", stem, i),
            };
            let alt_path = self.dir.join(candidate);
            if !alt_path.exists() {
                return alt_path;
            }
        }

        path
    }
}

#[async_trait]
impl SavePrompt for DirectorySavePrompt {
    async fn prompt_save_path(
        &self,
        suggested_name: &str,
        filter: &ExtensionFilter,
    ) -> Result<SaveChoice> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create recordings directory {:?}", self.dir))?;

        let path = filter.apply(self.available_path(suggested_name));
        debug!("Auto-selected save path {:?}", path);
        Ok(SaveChoice::Path(path))
    }
}

/// Terminal prompt: the suggested path is pre-filled, an empty answer or
/// Ctrl-C cancels.
pub struct InteractiveSavePrompt {
    default_dir: PathBuf,
}

impl InteractiveSavePrompt {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }
}

#[async_trait]
impl SavePrompt for InteractiveSavePrompt {
    async fn prompt_save_path(
        &self,
        suggested_name: &str,
        filter: &ExtensionFilter,
    ) -> Result<SaveChoice> {
        let initial = self.default_dir.join(suggested_name);
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || {
            let answer = dialoguer::Input::<String>::new()
                .with_prompt(format!("Save recording ({})", filter.name))
                .with_initial_text(initial.to_string_lossy())
                .allow_empty(true)
                .interact_text();

            match answer {
                Ok(text) if text.trim().is_empty() => Ok(SaveChoice::Cancelled),
                Ok(text) => Ok(SaveChoice::Path(filter.apply(PathBuf::from(text.trim())))),
                Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                    info!("Save prompt interrupted");
                    Ok(SaveChoice::Cancelled)
                }
                Err(e) => Err(anyhow::Error::new(e).context("Save prompt failed")),
            }
        })
        .await
        .context("Save prompt task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filter_appends_missing_extension() {
        let filter = ExtensionFilter::webm();
        assert_eq!(
            filter.apply(PathBuf::from("/tmp/clip")),
            PathBuf::from("/tmp/clip.webm")
        );
        assert_eq!(
            filter.apply(PathBuf::from("/tmp/clip.mkv")),
            PathBuf::from("/tmp/clip.mkv")
        );
    }

    #[test]
    fn test_suggested_file_name() {
        let name = suggested_file_name("recording", &ExtensionFilter::webm());
        assert!(name.starts_with("recording-"));
        assert!(name.ends_with(".webm"));
        // recording-YYYYmmdd-HHMMSS.webm
        assert_eq!(name.len(), "recording-".len() + 15 + ".webm".len());
    }

    #[tokio::test]
    async fn test_directory_prompt_creates_dir() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("recordings");
        let prompt = DirectorySavePrompt::new(&dir);

        let choice = prompt
            .prompt_save_path("clip.webm", &ExtensionFilter::webm())
            .await
            .unwrap();

        assert_eq!(choice, SaveChoice::Path(dir.join("clip.webm")));
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_directory_prompt_avoids_collisions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.webm"), b"taken").unwrap();
        std::fs::write(dir.path().join("clip-1.webm"), b"taken").unwrap();
        let prompt = DirectorySavePrompt::new(dir.path());

        let choice = prompt
            .prompt_save_path("clip.webm", &ExtensionFilter::webm())
            .await
            .unwrap();

        assert_eq!(choice, SaveChoice::Path(dir.path().join("clip-2.webm")));
    }
}
