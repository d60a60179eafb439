use crate::global;
use crate::storage::RetentionPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recording: RecordingConfig,
    pub encoder: EncoderConfig,
    pub capture: CaptureConfig,
    pub api: ApiConfig,
}

/// How the save location is chosen when a session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePromptMode {
    /// Timestamped file in `output_dir`, no questions asked.
    #[default]
    Auto,
    /// Ask on the terminal, with the timestamped path pre-filled.
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Empty means `<data_dir>/recast/recordings`.
    pub output_dir: String,
    pub file_prefix: String,
    pub retention: RetentionPolicy,
    pub chunk_queue_capacity: usize,
    pub save_prompt: SavePromptMode,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: String::new(),
            file_prefix: "recording".to_string(),
            retention: RetentionPolicy::Keep,
            chunk_queue_capacity: 256,
            save_prompt: SavePromptMode::Auto,
        }
    }
}

impl RecordingConfig {
    pub fn output_dir(&self) -> Result<PathBuf> {
        non_empty(&self.output_dir).map_or_else(global::recordings_dir, Ok)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Empty means look up `ffmpeg` on PATH.
    pub ffmpeg_path: String,
    /// 0 disables the timeout.
    pub timeout_seconds: u64,
}

impl EncoderConfig {
    pub fn ffmpeg_path(&self) -> Option<&str> {
        let path = self.ffmpeg_path.trim();
        (!path.is_empty()).then_some(path)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Empty means `<data_dir>/recast/sources`.
    pub replay_dir: String,
    pub chunk_size: usize,
    pub chunk_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            replay_dir: String::new(),
            chunk_size: 64 * 1024,
            chunk_interval_ms: 1000,
        }
    }
}

impl CaptureConfig {
    pub fn replay_dir(&self) -> Result<PathBuf> {
        non_empty(&self.replay_dir).map_or_else(global::sources_dir, Ok)
    }

    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3838 }
    }
}

fn non_empty(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
