//! Readiness probing for the launched server.
//!
//! The harness never trusts a fixed startup delay. Instead it retries a
//! lightweight probe until the server answers, while also polling the
//! child so an early crash is reported as a startup failure rather than
//! burning the whole deadline.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::HarnessError;
use crate::server::ServerProcess;

/// How long a single TCP connect attempt may take before it counts as
/// "not ready".
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// A single readiness signal for the server.
///
/// Object-safe so the harness can hold a `Box<dyn Probe>` chosen at
/// runtime.
#[async_trait]
pub trait Probe: Send + Sync {
    /// One readiness attempt. `true` means the server can serve requests.
    async fn check(&self) -> bool;

    /// Human-readable description used in logs and timeout errors.
    fn describe(&self) -> String;
}

// Compile-time assertion: Probe must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Probe) {}
};

/// Readiness = the server's listen socket accepts a TCP connection.
///
/// BlobStash serves HTTP on its `listen` address; the socket accepting
/// connections is the last thing its bootstrap sequence enables.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self) -> bool {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(err)) => {
                trace!(addr = %self.addr, error = %err, "connect refused");
                false
            }
            Err(_elapsed) => {
                trace!(addr = %self.addr, "connect timed out");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("tcp connect to {}", self.addr)
    }
}

/// Readiness = a filesystem path exists.
///
/// The server creates its data directory during bootstrap, which makes
/// that directory a usable no-network readiness signal.
#[derive(Debug, Clone)]
pub struct PathProbe {
    path: PathBuf,
}

impl PathProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Probe for PathProbe {
    async fn check(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn describe(&self) -> String {
        format!("path exists: {}", self.path.display())
    }
}

/// Retry pacing and overall deadline for [`wait_until_ready`].
#[derive(Debug, Clone)]
pub struct ReadinessOpts {
    /// Overall deadline; exceeding it is [`HarnessError::ReadyTimeout`].
    pub timeout: Duration,
    /// Pause between probe attempts.
    pub poll_interval: Duration,
}

impl Default for ReadinessOpts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Wait until `probe` reports the server ready.
///
/// Between attempts the child is polled; an exit during startup is
/// [`HarnessError::Startup`]. The deadline is checked after each failed
/// attempt so a probe that succeeds right at the boundary still wins.
pub async fn wait_until_ready(
    process: &mut ServerProcess,
    probe: &dyn Probe,
    opts: &ReadinessOpts,
) -> Result<(), HarnessError> {
    let started = Instant::now();
    let deadline = started + opts.timeout;

    loop {
        if let Some(status) = process.try_wait()? {
            return Err(HarnessError::Startup { status });
        }

        if probe.check().await {
            debug!(
                probe = %probe.describe(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "server is ready"
            );
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(HarnessError::ReadyTimeout {
                probe: probe.describe(),
                waited: opts.timeout,
            });
        }

        tokio::time::sleep(opts.poll_interval).await;
    }
}
