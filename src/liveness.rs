//! Liveness monitor — periodically probes the host and stops the collector
//! once it is gone.
//!
//! The host disappearing is the normal end of a collector's life, so the
//! first failed probe is recorded as an informational entry and reported as
//! [`StopReason::HostGone`], not as an error.

use std::sync::Arc;
use std::time::Duration;

use tablog_core::{formatter, RotatingLogSink};
use tablog_feeds::{ProtocolClient, StopReason, StopSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Message recorded when the probe fails.
pub const HOST_GONE_MESSAGE: &str = "Host disconnected, shutting down";

pub struct LivenessMonitor {
    client: Arc<dyn ProtocolClient>,
    sink: Arc<RotatingLogSink>,
    interval: Duration,
    cancel: CancellationToken,
}

impl LivenessMonitor {
    /// # Arguments
    ///
    /// * `client` - Host to probe
    /// * `sink` - Where the shutdown reason is recorded
    /// * `interval` - Time between probes; the first probe waits one interval
    /// * `cancel` - Token to signal monitor shutdown
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        sink: Arc<RotatingLogSink>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            sink,
            interval,
            cancel,
        }
    }

    pub fn spawn(self, stop: StopSender) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(stop).await;
        })
    }

    /// Probe until the host fails to answer or the token is cancelled.
    ///
    /// Returns `true` when the host was found gone.
    pub async fn run(self, stop: StopSender) -> bool {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(address = %self.client.address(), interval = ?self.interval, "starting liveness monitor");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("liveness monitor cancelled");
                    return false;
                }
                _ = ticker.tick() => {}
            }

            let Err(e) = self.client.probe_version().await else {
                continue;
            };

            info!(address = %self.client.address(), error = %e, "host unreachable");
            let reason = match self
                .sink
                .append(&formatter::collector_entry(HOST_GONE_MESSAGE))
                .await
            {
                Ok(()) => StopReason::HostGone,
                Err(e) => {
                    warn!(error = %e, "failed to record host disconnect");
                    StopReason::PersistenceFailed(e.to_string())
                }
            };
            let _ = stop.send(reason);
            return true;
        }
    }
}
