//! Stop reasons flowing from sessions and the liveness monitor to the
//! supervisor.

use tokio::sync::mpsc;

/// Why the collector is shutting down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The liveness probe failed: the host is gone. Expected end of life.
    HostGone,
    /// SIGINT / SIGTERM.
    Interrupted,
    /// The output artifact could not be written.
    PersistenceFailed(String),
}

impl StopReason {
    /// Process exit code for this reason.
    pub fn exit_code(&self) -> u8 {
        match self {
            StopReason::HostGone | StopReason::Interrupted => 0,
            StopReason::PersistenceFailed(_) => 1,
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::HostGone => write!(f, "host disconnected"),
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::PersistenceFailed(reason) => write!(f, "persistence failed: {reason}"),
        }
    }
}

pub type StopSender = mpsc::UnboundedSender<StopReason>;
pub type StopReceiver = mpsc::UnboundedReceiver<StopReason>;

pub fn stop_channel() -> (StopSender, StopReceiver) {
    mpsc::unbounded_channel()
}
