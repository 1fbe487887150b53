//! Process lock artifact.
//!
//! Format: a single line holding the collector's process id.
//! ```text
//! <pid>
//! ```
//! The file is created at start-up and removed on clean shutdown. A file
//! left behind by an unclean exit is possibly stale; readers must not treat
//! its presence as proof that a collector is running.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default location of the lock artifact.
pub const DEFAULT_LOCK_PATH: &str = "/tmp/browser-log-collector.pid";

/// Handle to a written lock file. [`LockFile::release`] is idempotent.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Write the current process id to `path`.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        Self::acquire_with_pid(path, std::process::id())
    }

    /// Write `pid` atomically: temp file first, then rename over `path`.
    pub fn acquire_with_pid(path: impl Into<PathBuf>, pid: u32) -> Result<Self> {
        let path = path.into();
        let lock_err = |source| Error::Lock {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(lock_err)?;
        }
        let mut temp = path.as_os_str().to_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, format!("{pid}\n")).map_err(lock_err)?;
        fs::rename(&temp, &path).map_err(lock_err)?;

        tracing::debug!(path = %path.display(), pid, "wrote lock file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file. Missing files are fine; other errors are traced
    /// and ignored since nothing can be done about them at exit.
    pub fn release(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed lock file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file"),
        }
    }
}

/// Read the pid recorded in a lock file.
pub fn read_pid(path: &Path) -> io::Result<u32> {
    fs::read_to_string(path)?
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<u32>().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing or invalid PID"))
}
