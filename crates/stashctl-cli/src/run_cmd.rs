//! `stashctl run`: start the server and supervise it until Ctrl-C.

use anyhow::{Context, Result};
use tracing::info;

use stashctl_core::harness::{Harness, RunOptions};
use stashctl_core::HarnessConfig;

pub async fn run(
    config: HarnessConfig,
    reindex: bool,
    log_level: Option<String>,
    clean: bool,
) -> Result<()> {
    let mut harness = Harness::new(config);

    harness
        .run(RunOptions { reindex, log_level })
        .await
        .context("failed to start server")?;

    info!("server ready; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    harness.shutdown().await.context("failed to stop server")?;

    if clean {
        harness.cleanup();
    }

    Ok(())
}
