//! Configuration module for objsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for objsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sync: SyncSection,
    pub destination: DestinationSection,
    pub upload: UploadSection,
    pub logging: LoggingSection,
}

/// Local source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    /// Root directory to synchronize from.
    pub root: PathBuf,
    /// Whether to descend into subdirectories.
    pub recursive: bool,
}

/// Remote store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationSection {
    /// Target bucket name.
    pub bucket: String,
    /// Store region (e.g. `eu-west-1`).
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (e.g. MinIO). `None` uses
    /// the provider default.
    pub endpoint: Option<String>,
    /// Key prefix all uploaded objects are placed under.
    pub prefix: Option<String>,
}

/// Upload tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSection {
    /// Concurrent part uploads per file.
    pub part_concurrency: usize,
    /// Total attempts per whole-file upload, including the first.
    pub retry_attempts: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/objsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("objsync")
            .join("config.yaml")
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            recursive: true,
        }
    }
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            part_concurrency: 4,
            retry_attempts: 3,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
