//! Ownership and supervision of the spawned server process.
//!
//! A [`ServerProcess`] owns exactly one child. Its stdout and stderr are
//! drained line-by-line on background tasks and re-emitted through
//! `tracing`, so server output lands in the harness log instead of
//! interleaving raw on the console.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, warn};

use crate::command::ServerCommand;
use crate::error::HarnessError;

/// A running (or recently exited) server child process.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
    pid: u32,
}

impl ServerProcess {
    /// Spawn the server described by `command`.
    pub fn spawn(command: &ServerCommand) -> Result<Self, HarnessError> {
        let mut cmd = command.build();
        let mut child = cmd.spawn().map_err(|source| HarnessError::Spawn {
            binary: command.binary_name().to_string(),
            source,
        })?;

        // id() is Some until the child has been reaped, which cannot have
        // happened yet.
        let pid = child.id().unwrap_or(0);

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, pid, LogStream::Stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, pid, LogStream::Stderr);
        }

        debug!(pid, argv = ?command.argv(), "spawned server process");

        Ok(Self { child, pid })
    }

    /// OS process id of the child.
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// Poll the child without blocking. `Some(status)` once it has exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, HarnessError> {
        self.child
            .try_wait()
            .map_err(|source| HarnessError::Wait { source })
    }

    /// Whether the child is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    /// Request graceful termination and wait for exit, escalating to a
    /// forced kill if the child has not exited within `grace`.
    ///
    /// On Unix this sends SIGTERM first; elsewhere it goes straight to the
    /// forced kill.
    pub async fn terminate(mut self, grace: Duration) -> Result<ExitStatus, HarnessError> {
        #[cfg(unix)]
        {
            if self.pid != 0 {
                // SAFETY: pid comes from a child we spawned.
                let ret = unsafe { libc::kill(self.pid as i32, libc::SIGTERM) };
                if ret != 0 {
                    warn!(pid = self.pid, "SIGTERM failed, escalating to SIGKILL");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(pid = self.pid, %status, "server exited after termination request");
                Ok(status)
            }
            Ok(Err(source)) => Err(HarnessError::Wait { source }),
            Err(_elapsed) => {
                debug!(
                    pid = self.pid,
                    grace_secs = grace.as_secs(),
                    "server did not exit within grace period, sending SIGKILL"
                );
                self.child
                    .kill()
                    .await
                    .map_err(|source| HarnessError::Wait { source })?;
                self.child
                    .wait()
                    .await
                    .map_err(|source| HarnessError::Wait { source })
            }
        }
    }
}

enum LogStream {
    Stdout,
    Stderr,
}

/// Drain one of the child's output pipes, re-emitting each line through
/// tracing. The task ends when the pipe closes.
fn forward_lines<R>(pipe: R, pid: u32, stream: LogStream)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match stream {
                LogStream::Stdout => debug!(target: "stashctl::server", pid, "{line}"),
                LogStream::Stderr => warn!(target: "stashctl::server", pid, "{line}"),
            }
        }
    });
}
