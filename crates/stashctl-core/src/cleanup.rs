//! Removal of the server's on-disk state between test runs.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::HarnessError;

/// Recursively remove the server's data directory.
///
/// A missing directory is not an error (the server may never have
/// started). Anything else -- permissions, I/O -- is surfaced so it does
/// not silently mask a broken teardown.
pub fn remove_data_dir(path: &Path) -> Result<(), HarnessError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed data directory");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(HarnessError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}
