//! Minimal view of the server's own YAML config.
//!
//! The harness treats the file as an opaque external input and only reads
//! the handful of keys it needs: where the server listens (for the
//! readiness probe) and where it keeps state (for cleanup). Everything
//! else is ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::HarnessError;

/// Listen address the server uses when its config does not set one.
pub const DEFAULT_LISTEN: &str = ":8051";

/// The subset of the BlobStash YAML config the harness cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigFile {
    #[serde(default)]
    pub listen: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ServerConfigFile {
    /// Read and parse the YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let contents = std::fs::read_to_string(path).map_err(|err| HarnessError::ServerConfig {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
        serde_yaml::from_str(&contents).map_err(|err| HarnessError::ServerConfig {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })
    }

    /// The configured listen address, or the server's built-in default.
    pub fn listen_or_default(&self) -> &str {
        self.listen.as_deref().unwrap_or(DEFAULT_LISTEN)
    }
}
