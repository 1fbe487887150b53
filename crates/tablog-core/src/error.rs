//! Error taxonomy shared by every tablog layer.

use std::io;
use std::path::PathBuf;

/// Result type for tablog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while collecting.
///
/// Only [`Error::Persistence`] and [`Error::Startup`] end the process; every
/// other variant is confined to the target that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host, or one specific target, cannot be reached.
    #[error("cannot connect to {address}: {reason}")]
    Connection { address: String, reason: String },

    /// A protocol domain failed to enable on a target.
    #[error("failed to enable {domain} on target {target}: {reason}")]
    Subscription {
        domain: String,
        target: String,
        reason: String,
    },

    /// The output artifact cannot be written.
    #[error("failed to persist log entry to {path}: {source}")]
    Persistence { path: PathBuf, source: io::Error },

    /// A protocol notification carried an unexpected payload.
    #[error("malformed {method} event: {source}")]
    Format {
        method: String,
        source: serde_json::Error,
    },

    /// The host answered a command with an error, or broke the framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The collector could not reach a state worth running in.
    #[error("startup failed: {0}")]
    Startup(String),

    /// Lock artifact I/O.
    #[error("lock file {path}: {source}")]
    Lock { path: PathBuf, source: io::Error },
}

impl Error {
    pub fn connection(address: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Connection {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must stop the whole collector.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Persistence { .. } | Error::Startup(_))
    }
}
