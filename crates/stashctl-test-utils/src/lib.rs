//! Shared fixtures for stashctl integration tests.
//!
//! Provides fake "blobstash" binaries as executable shell scripts written
//! into a tempdir. Each constructor models one server behavior the
//! harness has to cope with: crashing on startup, starting but never
//! becoming ready, refusing SIGTERM, or signalling readiness by touching
//! a path.
//!
//! Unix-only, like the suites that use it.

use std::path::{Path, PathBuf};

/// A fake server binary on disk. The script is deleted with the tempdir
/// when the fixture is dropped.
pub struct FakeServer {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl FakeServer {
    /// Write an executable script with the given body.
    pub fn from_script(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create fixture dir");
        let path = dir.path().join("fake_blobstash.sh");
        std::fs::write(&path, body).expect("failed to write fixture script");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("failed to mark fixture script executable");
        }

        Self { _dir: dir, path }
    }

    /// Exits immediately with the given code, like a server that fails to
    /// mount its config or data directory.
    pub fn exits_with(code: i32) -> Self {
        Self::from_script(&format!("#!/bin/sh\nexit {code}\n"))
    }

    /// Runs until killed; never signals readiness.
    pub fn sleeps_forever() -> Self {
        Self::from_script("#!/bin/sh\nexec sleep 3600\n")
    }

    /// Ignores SIGTERM; only a SIGKILL takes it down.
    pub fn ignores_sigterm() -> Self {
        Self::from_script("#!/bin/sh\ntrap '' TERM\nwhile :; do sleep 1; done\n")
    }

    /// Touches `marker` to signal readiness, then runs until killed.
    pub fn touches_then_sleeps(marker: &Path) -> Self {
        Self::from_script(&format!(
            "#!/bin/sh\ntouch '{}'\nexec sleep 3600\n",
            marker.display()
        ))
    }

    /// Creates a data directory the way the real server does during
    /// bootstrap, then runs until killed.
    pub fn creates_dir_then_sleeps(data_dir: &Path) -> Self {
        Self::from_script(&format!(
            "#!/bin/sh\nmkdir -p '{}'\nexec sleep 3600\n",
            data_dir.display()
        ))
    }

    /// Writes the value of the named environment variable into `out`,
    /// then runs until killed. Used to assert env overrides reach the
    /// child.
    pub fn dumps_env_then_sleeps(var: &str, out: &Path) -> Self {
        Self::from_script(&format!(
            "#!/bin/sh\nprintf '%s' \"${var}\" > '{}'\nexec sleep 3600\n",
            out.display()
        ))
    }

    /// Path to the script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as a `&str`, for APIs that take the binary name as a string.
    pub fn path_str(&self) -> &str {
        self.path.to_str().expect("fixture path is valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_written_and_executable() {
        let fake = FakeServer::exits_with(0);
        assert!(fake.path().exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(fake.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111, "script should be executable");
        }
    }

    #[test]
    fn marker_script_embeds_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("ready");
        let fake = FakeServer::touches_then_sleeps(&marker);

        let body = std::fs::read_to_string(fake.path()).unwrap();
        assert!(body.contains("touch"));
        assert!(body.contains(marker.to_str().unwrap()));
    }
}
