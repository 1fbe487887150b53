//! Collector supervisor — owns start-up, the run-until-stopped lifecycle and
//! the shutdown sequence.
//!
//! # Lifecycle
//!
//! ```text
//! start ──► lock file ──► rotate ──► list targets ──► sessions ──► discovery ──► monitor
//!                                                                                  │
//! run   ◄── HostGone / Interrupted / PersistenceFailed ◄───────────────────────────┘
//!  │
//!  └──► shutdown: cancel ──► drain + close sessions ──► close discovery ──► "stopped" entry ──► unlock
//! ```
//!
//! Everything the collector spawns hangs off one [`CancellationToken`];
//! shutdown cancels it and then waits for each task to wind down on its own.
//! Sessions record what their targets already delivered before closing, so
//! the stopped entry is always the last line a run writes.
//!
//! A start-up that fails after the started entry was written closes the run
//! in the artifact with the failure reason and the stopped entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tablog_core::config::Config;
use tablog_core::lockfile::LockFile;
use tablog_core::{formatter, Category, Error, LogEntry, LogLevel, Result, RotatingLogSink};
use tablog_feeds::{
    stop_channel, Discovery, DiscoveryEvent, ProtocolClient, StopReason, StopReceiver,
    StopSender, TargetRegistry,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::liveness::LivenessMonitor;

/// Message recorded once by the shutdown sequence.
pub const STOPPED_MESSAGE: &str = "Log collector stopped";

pub struct Collector {
    config: Config,
    client: Arc<dyn ProtocolClient>,
    sink: Arc<RotatingLogSink>,
    registry: Arc<TargetRegistry>,
    lock: LockFile,
    cancel: CancellationToken,
    stop_tx: StopSender,
    stop_rx: StopReceiver,
    /// Monitor and discovery loops.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Sessions being opened on behalf of discovery notifications.
    adds: TaskTracker,
    /// Set once the started entry is on disk.
    started: AtomicBool,
    stopped: AtomicBool,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("address", &self.client.address())
            .field("output", &self.sink.path())
            .field("registry", &self.registry)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl Collector {
    /// Bring the collector up: lock file, rotation, initial targets,
    /// discovery and liveness monitoring.
    ///
    /// Fails with [`Error::Startup`] when the host cannot be reached, exposes
    /// no targets of the configured type, or none of them can be connected.
    /// On failure every session opened so far is closed and the lock file is
    /// removed.
    pub async fn start(config: Config, client: Arc<dyn ProtocolClient>) -> Result<Self> {
        let lock = LockFile::acquire(&config.collector.lock_path)?;
        let sink = Arc::new(RotatingLogSink::new(
            &config.output.path,
            config.output.max_size_bytes,
        ));
        let cancel = CancellationToken::new();
        let (stop_tx, stop_rx) = stop_channel();
        let registry = TargetRegistry::new(
            Arc::clone(&client),
            Arc::clone(&sink),
            stop_tx.clone(),
            cancel.child_token(),
        );

        let collector = Self {
            config,
            client,
            sink,
            registry,
            lock,
            cancel,
            stop_tx,
            stop_rx,
            tasks: Mutex::new(Vec::new()),
            adds: TaskTracker::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        };

        match collector.boot().await {
            Ok(()) => Ok(collector),
            Err(e) => {
                collector.abort_startup(&e).await;
                Err(e)
            }
        }
    }

    async fn boot(&self) -> Result<()> {
        self.sink.rotate_if_oversized().await?;

        let address = self.client.address();
        let target_type = &self.config.collector.target_type;
        let targets = self
            .client
            .list_targets()
            .await
            .map_err(|e| Error::Startup(format!("cannot reach host at {address}: {e}")))?;
        let targets: Vec<_> = targets
            .into_iter()
            .filter(|t| &t.kind == target_type)
            .collect();
        if targets.is_empty() {
            return Err(Error::Startup(format!(
                "no {target_type} targets found at {address}"
            )));
        }

        self.sink
            .append(&formatter::collector_entry(format!(
                "Log collector started (port {})",
                self.config.host.port
            )))
            .await?;
        self.started.store(true, Ordering::SeqCst);

        let found = targets.len();
        for target in targets {
            let id = target.id.clone();
            match self.registry.add_if_absent(target).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(target_id = %id, error = %e, "skipping target"),
            }
        }
        if self.registry.is_empty() {
            return Err(Error::Startup(format!(
                "none of the {found} {target_type} targets could be connected"
            )));
        }

        let discovery = self
            .client
            .discover()
            .await
            .map_err(|e| Error::Startup(format!("cannot subscribe to target discovery: {e}")))?;

        let discovery_task = tokio::spawn(discovery_loop(
            discovery,
            Arc::clone(&self.registry),
            target_type.clone(),
            self.adds.clone(),
            self.cancel.child_token(),
            self.stop_tx.clone(),
        ));
        let monitor_task = LivenessMonitor::new(
            Arc::clone(&self.client),
            Arc::clone(&self.sink),
            self.config.collector.liveness_interval(),
            self.cancel.child_token(),
        )
        .spawn(self.stop_tx.clone());
        self.lock_tasks().extend([discovery_task, monitor_task]);

        info!(
            %address,
            sessions = self.registry.len(),
            output = %self.sink.path().display(),
            "collector ready"
        );
        Ok(())
    }

    async fn abort_startup(&self, error: &Error) {
        self.stopped.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        self.registry.close_all().await;
        if self.started.load(Ordering::SeqCst) {
            let failure = LogEntry::now(
                LogLevel::Error,
                format!("Log collector failed to start: {error}"),
            )
            .with_category(Category::Collector);
            for entry in [failure, formatter::collector_entry(STOPPED_MESSAGE)] {
                if let Err(e) = self.sink.append(&entry).await {
                    warn!(error = %e, "failed to record start-up failure");
                    break;
                }
            }
        }
        self.lock.release();
    }

    /// Wait for the first stop reason, run the shutdown sequence and return
    /// the reason.
    pub async fn run(&mut self) -> StopReason {
        let reason = tokio::select! {
            reason = self.stop_rx.recv() => reason.unwrap_or(StopReason::Interrupted),
            _ = interrupted() => StopReason::Interrupted,
        };
        info!(%reason, "stopping collector");
        self.shutdown().await;
        reason
    }

    /// Terminal shutdown sequence. Safe to call more than once; later calls
    /// do nothing.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.cancel.cancel();
        self.adds.close();
        self.adds.wait().await;
        self.registry.close_all().await;

        let tasks: Vec<_> = self.lock_tasks().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "collector task failed during shutdown");
            }
        }

        if let Err(e) = self
            .sink
            .append(&formatter::collector_entry(STOPPED_MESSAGE))
            .await
        {
            warn!(error = %e, "failed to record shutdown");
        }

        self.lock.release();
        debug!("collector stopped");
    }

    /// Sender that asks a running collector to stop.
    pub fn stopper(&self) -> StopSender {
        self.stop_tx.clone()
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn sink(&self) -> &Arc<RotatingLogSink> {
        &self.sink
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Route discovery notifications to the registry until cancelled, then close
/// the subscription.
///
/// Each creation is handled on its own task so a slow connect never holds
/// up the notifications behind it.
async fn discovery_loop(
    mut discovery: Box<dyn Discovery>,
    registry: Arc<TargetRegistry>,
    target_type: String,
    adds: TaskTracker,
    cancel: CancellationToken,
    stop: StopSender,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            event = discovery.next() => Some(event),
        };
        match next {
            None => break,
            Some(None) => {
                warn!("discovery subscription ended; new targets will not be picked up");
                return;
            }
            Some(Some(DiscoveryEvent::Created(target))) => {
                if target.kind != target_type {
                    continue;
                }
                let registry = Arc::clone(&registry);
                let stop = stop.clone();
                adds.spawn(async move {
                    let id = target.id.clone();
                    if let Err(e) = registry.add_if_absent(target).await {
                        report(&stop, &id, e);
                    }
                });
            }
            Some(Some(DiscoveryEvent::Destroyed(id))) => {
                if let Err(e) = registry.remove(&id).await {
                    report(&stop, &id, e);
                }
            }
        }
    }

    if let Err(e) = discovery.close().await {
        debug!(error = %e, "error while closing discovery (ignored)");
    }
}

fn report(stop: &StopSender, target_id: &str, e: Error) {
    if e.is_fatal() {
        warn!(%target_id, error = %e, "fatal error from discovery");
        let _ = stop.send(StopReason::PersistenceFailed(e.to_string()));
    } else {
        warn!(%target_id, error = %e, "skipping discovered target");
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
