//! Daemon configuration parsing.
//!
//! Configuration is a small TOML file; every field has a default so an
//! empty file (or no file at all) yields a working daemon.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::MAX_FRAME_SIZE;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path of the Unix socket to serve on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Maximum accepted frame size in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join("forgelined.sock")
}

const fn default_max_frame_size() -> usize {
    MAX_FRAME_SIZE
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// The config file is not valid TOML.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
