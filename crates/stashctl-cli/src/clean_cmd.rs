//! `stashctl clean`: remove the server's data directory.

use anyhow::{Context, Result};

use stashctl_core::cleanup;
use stashctl_core::HarnessConfig;

pub fn run(config: &HarnessConfig) -> Result<()> {
    cleanup::remove_data_dir(&config.data_dir)
        .with_context(|| format!("failed to clean {}", config.data_dir.display()))?;

    println!("Cleaned {}.", config.data_dir.display());
    Ok(())
}
