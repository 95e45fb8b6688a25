//! `stashctl check`: one readiness probe against a running server.

use anyhow::{bail, Result};

use stashctl_core::{HarnessConfig, Probe};

pub async fn run(config: &HarnessConfig) -> Result<()> {
    let probe = config.readiness_probe();

    if probe.check().await {
        println!("ready ({})", probe.describe());
        Ok(())
    } else {
        bail!("server is not ready ({})", probe.describe());
    }
}
