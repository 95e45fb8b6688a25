//! The harness: a start-once, stop-once lifecycle around one server
//! process.
//!
//! `run` launches the server and blocks until it is ready (or failed),
//! `shutdown` terminates it with bounded escalation, and `cleanup`
//! removes its on-disk state. At most one process is owned at a time.

use tracing::{info, warn};

use crate::cleanup;
use crate::command::ServerCommand;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::probe::{self, Probe, ReadinessOpts};
use crate::server::ServerProcess;

enum State {
    /// Created; no server has been started yet.
    NotRunning,
    /// A server process is owned (believed alive).
    Running(ServerProcess),
    /// The server has been shut down; the harness is spent.
    Finished,
}

/// Per-run options, mirroring the knobs the server CLI exposes.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pass `-scan` so the server rebuilds its index at startup.
    pub reindex: bool,
    /// Override the configured server log level for this run.
    pub log_level: Option<String>,
}

/// Manages the lifecycle of one external server process.
pub struct Harness {
    config: HarnessConfig,
    probe_override: Option<Box<dyn Probe>>,
    state: State,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            probe_override: None,
            state: State::NotRunning,
        }
    }

    /// A harness using the conventional defaults.
    pub fn with_defaults() -> Self {
        Self::new(HarnessConfig::default())
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Replace the configured readiness probe.
    pub fn set_probe(&mut self, probe: Box<dyn Probe>) {
        self.probe_override = Some(probe);
    }

    /// Launch the server and wait until it is ready to serve requests.
    ///
    /// On failure no process is left behind: an early exit is reported as
    /// [`HarnessError::Startup`], and a server that never becomes ready is
    /// terminated before [`HarnessError::ReadyTimeout`] is returned. A
    /// failed run leaves the harness in its not-running state.
    pub async fn run(&mut self, opts: RunOptions) -> Result<(), HarnessError> {
        match self.state {
            State::Running(_) => return Err(HarnessError::AlreadyRunning),
            State::Finished => return Err(HarnessError::AlreadyFinished),
            State::NotRunning => {}
        }

        let log_level = opts
            .log_level
            .as_deref()
            .unwrap_or(&self.config.log_level);
        let command = ServerCommand::new()
            .binary(&self.config.binary)
            .log_level(log_level)
            .reindex(opts.reindex)
            .config_path(&self.config.server_config);

        info!(argv = ?command.argv(), "starting server");
        let mut process = ServerProcess::spawn(&command)?;

        let probe = self
            .probe_override
            .take()
            .unwrap_or_else(|| self.config.readiness_probe());
        let ready_opts = ReadinessOpts {
            timeout: self.config.startup_timeout(),
            ..ReadinessOpts::default()
        };

        let ready = probe::wait_until_ready(&mut process, probe.as_ref(), &ready_opts).await;
        self.probe_override = Some(probe);

        match ready {
            Ok(()) => {
                info!(pid = process.id(), "server is ready");
                self.state = State::Running(process);
                Ok(())
            }
            Err(err) => {
                // Do not leave a half-started server behind. On Startup
                // the child already exited, so there is nothing to reap.
                if !matches!(err, HarnessError::Startup { .. }) {
                    if let Err(kill_err) =
                        process.terminate(self.config.shutdown_grace()).await
                    {
                        warn!(error = %kill_err, "failed to reap unready server");
                    }
                }
                Err(err)
            }
        }
    }

    /// Terminate the server and wait for it to exit.
    ///
    /// SIGTERM first; escalation to SIGKILL after the configured grace
    /// period. A no-op when no server was ever started.
    pub async fn shutdown(&mut self) -> Result<(), HarnessError> {
        match std::mem::replace(&mut self.state, State::Finished) {
            State::Running(process) => {
                let pid = process.id();
                info!(pid, "stopping server");
                let status = process.terminate(self.config.shutdown_grace()).await?;
                info!(pid, %status, "server stopped");
                Ok(())
            }
            State::NotRunning => {
                // Never started: stay startable.
                self.state = State::NotRunning;
                Ok(())
            }
            State::Finished => Ok(()),
        }
    }

    /// Remove the server's data directory.
    ///
    /// Best-effort by contract: a missing directory is fine, and any other
    /// failure is logged rather than raised. Callers that need the error
    /// use [`cleanup::remove_data_dir`] directly.
    pub fn cleanup(&self) {
        if let Err(err) = cleanup::remove_data_dir(&self.config.data_dir) {
            warn!(error = %err, "failed to remove data directory");
        }
    }

    /// Whether the owned server process is currently alive.
    pub fn is_running(&mut self) -> bool {
        match self.state {
            State::Running(ref mut process) => process.is_running(),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::NotRunning => "not-running",
            State::Running(_) => "running",
            State::Finished => "finished",
        };
        f.debug_struct("Harness")
            .field("binary", &self.config.binary)
            .field("state", &state)
            .finish()
    }
}
