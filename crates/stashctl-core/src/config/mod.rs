//! Harness configuration.
//!
//! Resolution chain: explicit CLI flag > `STASHCTL_*` env var >
//! `stashctl.toml` > built-in default. The file is optional; a test suite
//! that is happy with the conventions (binary on `$PATH`, config at
//! `./tests/blobstash.yaml`, data in `./blobstash_data`) needs none of it.

pub mod server_file;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{DEFAULT_BINARY, DEFAULT_CONFIG_PATH, DEFAULT_LOG_LEVEL};
use crate::error::HarnessError;
use crate::probe::{PathProbe, Probe, TcpProbe};

use server_file::ServerConfigFile;

/// Directory the server writes its state into, relative to the working
/// directory, unless overridden.
pub const DEFAULT_DATA_DIR: &str = "blobstash_data";

/// Conventional location of the harness config file.
pub const CONFIG_FILE: &str = "stashctl.toml";

/// Fully resolved harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Server binary name or path.
    pub binary: String,
    /// Path to the server's YAML config, passed through untouched.
    pub server_config: PathBuf,
    /// Directory removed by `cleanup`.
    pub data_dir: PathBuf,
    /// Address probed for readiness. When unset it is derived from the
    /// server config's `listen`, falling back to watching `data_dir`.
    pub probe_addr: Option<String>,
    /// Default server log level, overridable per run.
    pub log_level: String,
    /// Overall readiness deadline.
    pub startup_timeout_secs: u64,
    /// How long a SIGTERM gets before escalation to SIGKILL.
    pub shutdown_grace_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            server_config: PathBuf::from(DEFAULT_CONFIG_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            probe_addr: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            startup_timeout_secs: 15,
            shutdown_grace_secs: 5,
        }
    }
}

impl HarnessConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&contents).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve configuration from file, environment, and defaults.
    ///
    /// An explicitly named file must exist; the conventional
    /// `stashctl.toml` is used only when present. Environment variables
    /// are applied on top either way.
    pub fn resolve(file: Option<&Path>) -> Result<Self, HarnessError> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay `STASHCTL_*` environment variables.
    fn apply_env_overrides(&mut self) {
        if let Ok(binary) = std::env::var("STASHCTL_BIN") {
            self.binary = binary;
        }
        if let Ok(path) = std::env::var("STASHCTL_SERVER_CONFIG") {
            self.server_config = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("STASHCTL_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("STASHCTL_PROBE_ADDR") {
            self.probe_addr = Some(addr);
        }
        if let Ok(level) = std::env::var("STASHCTL_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Choose the readiness probe for this configuration.
    ///
    /// Priority: explicit `probe_addr` > the `listen` address from the
    /// server's own config > watching for the data directory to appear.
    /// The server config is an opaque external input, so a missing or
    /// unparseable file downgrades to the path probe instead of failing.
    pub fn readiness_probe(&self) -> Box<dyn Probe> {
        if let Some(ref addr) = self.probe_addr {
            return Box::new(TcpProbe::new(addr.clone()));
        }

        match ServerConfigFile::load(&self.server_config) {
            Ok(server_config) => {
                let addr = probe_addr_for_listen(server_config.listen_or_default());
                Box::new(TcpProbe::new(addr))
            }
            Err(err) => {
                debug!(
                    error = %err,
                    data_dir = %self.data_dir.display(),
                    "server config unavailable, probing for data directory instead"
                );
                Box::new(PathProbe::new(self.data_dir.clone()))
            }
        }
    }

    pub fn startup_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Turn a server `listen` value into a connectable address.
///
/// BlobStash accepts Go-style listen strings like `:8051` or
/// `0.0.0.0:8051`, which bind all interfaces; the probe connects via
/// loopback in those cases.
pub fn probe_addr_for_listen(listen: &str) -> String {
    if let Some(port) = listen.strip_prefix(':') {
        return format!("127.0.0.1:{port}");
    }
    if let Some(port) = listen.strip_prefix("0.0.0.0:") {
        return format!("127.0.0.1:{port}");
    }
    listen.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    /// Serialise tests that mutate process-wide environment variables.
    fn lock_env() -> MutexGuard<'static, ()> {
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    const ENV_VARS: &[&str] = &[
        "STASHCTL_BIN",
        "STASHCTL_SERVER_CONFIG",
        "STASHCTL_DATA_DIR",
        "STASHCTL_PROBE_ADDR",
        "STASHCTL_LOG_LEVEL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn defaults_match_conventions() {
        let config = HarnessConfig::default();
        assert_eq!(config.binary, "blobstash");
        assert_eq!(config.server_config, PathBuf::from("./tests/blobstash.yaml"));
        assert_eq!(config.data_dir, PathBuf::from("blobstash_data"));
        assert_eq!(config.log_level, "error");
        assert!(config.probe_addr.is_none());
    }

    #[test]
    fn load_roundtrips_through_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stashctl.toml");

        let mut original = HarnessConfig::default();
        original.binary = "/opt/blobstash/bin/blobstash".to_string();
        original.probe_addr = Some("127.0.0.1:9051".to_string());
        original.shutdown_grace_secs = 2;

        let contents = toml::to_string_pretty(&original).unwrap();
        std::fs::write(&path, contents).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.binary, original.binary);
        assert_eq!(loaded.probe_addr, original.probe_addr);
        assert_eq!(loaded.shutdown_grace_secs, 2);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stashctl.toml");
        std::fs::write(&path, "binary = \"./target/blobstash\"\n").unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.binary, "./target/blobstash");
        assert_eq!(loaded.log_level, "error");
        assert_eq!(loaded.startup_timeout_secs, 15);
    }

    #[test]
    fn load_missing_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let result = HarnessConfig::load(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(HarnessError::ConfigRead { .. })));
    }

    #[test]
    fn load_invalid_toml_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "binary = [not toml").unwrap();

        let result = HarnessConfig::load(&path);
        assert!(matches!(result, Err(HarnessError::ConfigParse { .. })));
    }

    #[test]
    fn env_vars_override_defaults() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var("STASHCTL_BIN", "/usr/local/bin/blobstash") };
        unsafe { std::env::set_var("STASHCTL_PROBE_ADDR", "127.0.0.1:9999") };

        let config = HarnessConfig::resolve(None).unwrap();

        clear_env();

        assert_eq!(config.binary, "/usr/local/bin/blobstash");
        assert_eq!(config.probe_addr.as_deref(), Some("127.0.0.1:9999"));
        // Untouched fields keep their defaults.
        assert_eq!(config.log_level, "error");
    }

    #[test]
    fn env_vars_override_file_values() {
        let _lock = lock_env();
        clear_env();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stashctl.toml");
        std::fs::write(&path, "binary = \"from-file\"\nlog_level = \"info\"\n").unwrap();

        unsafe { std::env::set_var("STASHCTL_BIN", "from-env") };

        let config = HarnessConfig::resolve(Some(&path)).unwrap();

        clear_env();

        assert_eq!(config.binary, "from-env");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn explicit_probe_addr_wins() {
        let mut config = HarnessConfig::default();
        config.probe_addr = Some("127.0.0.1:8051".to_string());
        let probe = config.readiness_probe();
        assert_eq!(probe.describe(), "tcp connect to 127.0.0.1:8051");
    }

    #[test]
    fn probe_falls_back_to_data_dir_without_server_config() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::default();
        config.server_config = tmp.path().join("missing.yaml");
        config.data_dir = tmp.path().join("blobstash_data");

        let probe = config.readiness_probe();
        assert!(
            probe.describe().starts_with("path exists:"),
            "expected path probe, got: {}",
            probe.describe()
        );
    }

    #[test]
    fn probe_uses_listen_from_server_config() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = tmp.path().join("blobstash.yaml");
        std::fs::write(&yaml, "listen: ':9051'\ndata_dir: blobstash_data\n").unwrap();

        let mut config = HarnessConfig::default();
        config.server_config = yaml;

        let probe = config.readiness_probe();
        assert_eq!(probe.describe(), "tcp connect to 127.0.0.1:9051");
    }

    #[test]
    fn listen_strings_become_connectable() {
        assert_eq!(probe_addr_for_listen(":8051"), "127.0.0.1:8051");
        assert_eq!(probe_addr_for_listen("0.0.0.0:8051"), "127.0.0.1:8051");
        assert_eq!(probe_addr_for_listen("127.0.0.1:8051"), "127.0.0.1:8051");
        assert_eq!(probe_addr_for_listen("example.com:80"), "example.com:80");
    }
}
