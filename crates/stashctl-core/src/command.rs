//! Construction of the server launch command.
//!
//! The server CLI is `blobstash --loglevel <level> [-scan] <config-file>`.
//! `-scan` is single-dash (the server parses its flags Go-style) and the
//! config-file path is always the final argument.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;

/// Binary name used when no override is given; resolved via `$PATH`.
pub const DEFAULT_BINARY: &str = "blobstash";

/// Log level passed to the server when the caller does not choose one.
pub const DEFAULT_LOG_LEVEL: &str = "error";

/// Conventional location of the server config within a test suite.
pub const DEFAULT_CONFIG_PATH: &str = "./tests/blobstash.yaml";

/// Builder for the server launch command.
///
/// Environment overrides are merged over the harness's own environment;
/// the child always inherits everything not explicitly overridden.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    binary: String,
    log_level: String,
    reindex: bool,
    config_path: PathBuf,
    working_dir: Option<PathBuf>,
    env_overrides: HashMap<String, String>,
}

impl ServerCommand {
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            reindex: false,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            working_dir: None,
            env_overrides: HashMap::new(),
        }
    }

    /// Use a different binary name or path.
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Server log level (debug|info|warn|crit).
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Ask the server to rescan its blob index at startup (`-scan`).
    pub fn reindex(mut self, reindex: bool) -> Self {
        self.reindex = reindex;
        self
    }

    /// Path to the server's YAML config, passed through untouched as the
    /// last argument.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Working directory for the child process.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Override a single environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    pub fn binary_name(&self) -> &str {
        &self.binary
    }

    pub fn config_file(&self) -> &Path {
        &self.config_path
    }

    /// Arguments passed to the binary, in order.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["--loglevel".to_string(), self.log_level.clone()];
        if self.reindex {
            args.push("-scan".to_string());
        }
        args.push(self.config_path.display().to_string());
        args
    }

    /// Full argv including the binary name, for logging and assertions.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.binary.clone()];
        argv.extend(self.args());
        argv
    }

    /// Build the runnable [`Command`].
    ///
    /// stdout/stderr are piped so the harness can forward server output
    /// into its own log; stdin is closed. `kill_on_drop` is set so a
    /// panicking test does not leak a server.
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.args());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        // Merge, don't replace the entire environment.
        for (key, value) in &self.env_overrides {
            cmd.env(key, value);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        cmd
    }
}

impl Default for ServerCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_argv() {
        let cmd = ServerCommand::new();
        assert_eq!(
            cmd.argv(),
            vec!["blobstash", "--loglevel", "error", "./tests/blobstash.yaml"]
        );
    }

    #[test]
    fn reindex_with_debug_level() {
        let cmd = ServerCommand::new().reindex(true).log_level("debug");
        assert_eq!(
            cmd.argv(),
            vec![
                "blobstash",
                "--loglevel",
                "debug",
                "-scan",
                "./tests/blobstash.yaml"
            ]
        );
    }

    #[test]
    fn scan_flag_present_iff_reindex() {
        for reindex in [false, true] {
            let cmd = ServerCommand::new().reindex(reindex);
            let has_scan = cmd.args().iter().any(|a| a == "-scan");
            assert_eq!(has_scan, reindex, "reindex={reindex}");
        }
    }

    #[test]
    fn config_path_is_always_last() {
        for reindex in [false, true] {
            let cmd = ServerCommand::new()
                .reindex(reindex)
                .config_path("/tmp/other.yaml");
            assert_eq!(cmd.args().last().map(String::as_str), Some("/tmp/other.yaml"));
        }
    }

    #[test]
    fn loglevel_immediately_follows_binary() {
        let cmd = ServerCommand::new().log_level("warn");
        let argv = cmd.argv();
        assert_eq!(argv[1], "--loglevel");
        assert_eq!(argv[2], "warn");
    }

    #[test]
    fn build_applies_args_and_env() {
        let cmd = ServerCommand::new()
            .binary("/opt/blobstash")
            .env("BLOBS_API_KEY", "123")
            .build();

        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "/opt/blobstash");

        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["--loglevel", "error", "./tests/blobstash.yaml"]);

        let has_override = std_cmd
            .get_envs()
            .any(|(k, v)| k == "BLOBS_API_KEY" && v.map(|v| v == "123").unwrap_or(false));
        assert!(has_override, "env override should be set on the command");
    }

    #[test]
    fn build_sets_working_dir() {
        let cmd = ServerCommand::new().working_dir("/tmp").build();
        assert_eq!(
            cmd.as_std().get_current_dir(),
            Some(std::path::Path::new("/tmp"))
        );
    }
}
