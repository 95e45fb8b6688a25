//! Error types for harness operations.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while managing the server process.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The server binary could not be launched at all.
    #[error("failed to spawn server binary '{binary}' -- is it installed and on PATH?")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The server exited while the harness was still waiting for it to
    /// become ready.
    #[error("server exited before becoming ready ({status})")]
    Startup { status: ExitStatus },

    /// The server stayed alive but never answered the readiness probe
    /// within the startup deadline.
    #[error("server not ready after {waited:?} ({probe})")]
    ReadyTimeout { probe: String, waited: Duration },

    /// `run` was called while a server is already running.
    #[error("a server is already running under this harness")]
    AlreadyRunning,

    /// `run` was called on a harness whose server has been shut down.
    /// The lifecycle is start-once; build a fresh harness to restart.
    #[error("this harness has already been shut down and cannot restart the server")]
    AlreadyFinished,

    /// Waiting on the server process failed at the OS level.
    #[error("failed to wait on server process")]
    Wait {
        #[source]
        source: std::io::Error,
    },

    /// Removing the data directory failed for a reason other than the
    /// directory not existing.
    #[error("failed to remove data directory {path}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A harness config file could not be read.
    #[error("failed to read config file at {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A harness config file could not be parsed.
    #[error("failed to parse config file at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The server's own YAML config could not be read or parsed.
    #[error("failed to load server config at {path}: {detail}")]
    ServerConfig { path: PathBuf, detail: String },
}
