mod check_cmd;
mod clean_cmd;
mod run_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stashctl_core::HarnessConfig;

#[derive(Parser)]
#[command(
    name = "stashctl",
    about = "Run a BlobStash server for test and debug sessions"
)]
struct Cli {
    /// Path to a stashctl.toml (defaults to ./stashctl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server, wait until it is ready, supervise until Ctrl-C
    Run {
        /// Ask the server to rescan its blob index at startup
        #[arg(long)]
        reindex: bool,
        /// Server log level (debug|info|warn|crit)
        #[arg(long)]
        log_level: Option<String>,
        /// Remove the data directory after shutdown
        #[arg(long)]
        clean: bool,
    },
    /// Probe a running server once; exit 0 if it is ready
    Check,
    /// Remove the server's data directory
    Clean,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = HarnessConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            reindex,
            log_level,
            clean,
        } => run_cmd::run(config, reindex, log_level, clean).await,
        Commands::Check => check_cmd::run(&config).await,
        Commands::Clean => clean_cmd::run(&config),
    }
}
