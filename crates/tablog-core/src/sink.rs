//! Rotating log sink — append-only JSONL persistence with a single backup
//! generation.
//!
//! The sink is the only component that touches the output file. Sessions,
//! the liveness monitor and the supervisor all share one `Arc<RotatingLogSink>`
//! and go through [`RotatingLogSink::append`].
//!
//! Rotation is checked once, at start-up, by [`RotatingLogSink::rotate_if_oversized`].
//! Appends never re-check the size, so the active file may grow past the
//! threshold during a long run.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::LogEntry;

/// Default rotation threshold: 10 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Append-only JSONL writer that owns the output file handle.
#[derive(Debug)]
pub struct RotatingLogSink {
    path: PathBuf,
    backup: PathBuf,
    max_size: u64,
    /// Opened lazily so that a rotation leaves the next append to create a
    /// fresh file. The lock also serialises appends.
    file: Mutex<Option<File>>,
}

impl RotatingLogSink {
    pub fn new(path: impl Into<PathBuf>, max_size: u64) -> Self {
        let path = path.into();
        Self {
            backup: backup_path_for(&path),
            path,
            max_size,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.old`
    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Append one entry as a single newline-terminated JSON record.
    ///
    /// The record is written with one `write_all` and flushed before the
    /// lock is released, so concurrent appends never interleave and nothing
    /// is held in memory between calls.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        let record = entry
            .to_record()
            .map_err(|e| self.persistence(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut guard = self.file.lock().await;
        let mut file = match guard.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| self.persistence(e))?,
        };

        let written = async {
            file.write_all(record.as_bytes()).await?;
            file.flush().await
        }
        .await;
        // A failed handle is dropped so the next append reopens the file.
        written.map_err(|e| self.persistence(e))?;
        *guard = Some(file);
        Ok(())
    }

    /// Move an oversized active file to `<path>.old`, replacing any previous
    /// backup. Returns `true` when a rotation happened.
    ///
    /// A missing active file is not an error. Must run before the first
    /// append; an already-open handle is dropped.
    pub async fn rotate_if_oversized(&self) -> Result<bool> {
        let size = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.persistence(e)),
        };
        if size <= self.max_size {
            return Ok(false);
        }

        let mut guard = self.file.lock().await;
        *guard = None;

        match tokio::fs::remove_file(&self.backup).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.persistence(e)),
        }
        tokio::fs::rename(&self.path, &self.backup)
            .await
            .map_err(|e| self.persistence(e))?;

        tracing::info!(
            path = %self.path.display(),
            backup = %self.backup.display(),
            size,
            max_size = self.max_size,
            "rotated oversized log file"
        );
        Ok(true)
    }

    fn persistence(&self, source: io::Error) -> Error {
        Error::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut backup = path.as_os_str().to_os_string();
    backup.push(".old");
    PathBuf::from(backup)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
