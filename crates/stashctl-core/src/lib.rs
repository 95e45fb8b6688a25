//! Lifecycle management for an external BlobStash server binary.
//!
//! Test suites (and the `stashctl` CLI) use this crate to launch the
//! server with the right arguments, wait until it can actually serve
//! requests, tear it down deterministically, and wipe its on-disk state
//! between runs.
//!
//! # Architecture
//!
//! ```text
//! Harness
//!   |
//!   |  run(opts) ---> ServerCommand --build--> ServerProcess::spawn
//!   |                                               |
//!   |       wait_until_ready(process, probe) <------+
//!   |           (TcpProbe | PathProbe, deadline + early-exit check)
//!   |
//!   |  shutdown() --> ServerProcess::terminate (SIGTERM, grace, SIGKILL)
//!   |  cleanup()  --> cleanup::remove_data_dir
//! ```
//!
//! The server itself is opaque: the harness only knows its CLI
//! (`blobstash --loglevel <level> [-scan] <config>`), the listen address
//! in its YAML config, and the data directory it writes.

pub mod cleanup;
pub mod command;
pub mod config;
pub mod error;
pub mod harness;
pub mod probe;
pub mod server;

// Re-export the primary public API at the crate root.
pub use command::ServerCommand;
pub use config::HarnessConfig;
pub use config::server_file::ServerConfigFile;
pub use error::HarnessError;
pub use harness::{Harness, RunOptions};
pub use probe::{PathProbe, Probe, ReadinessOpts, TcpProbe};
pub use server::ServerProcess;
