//! Target registry — the set of live sessions, keyed by target id.
//!
//! The registry guarantees at most one session per target id. An id is
//! reserved (as [`SessionState::Connecting`]) before the connection is
//! opened, so a creation notification racing with start-up enumeration is a
//! no-op rather than a second session.
//!
//! The map lives behind a `std::sync::Mutex` that is never held across an
//! await point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tablog_core::{formatter, Result, RotatingLogSink, TargetDescriptor};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ProtocolClient;
use crate::session::{SessionEnd, SessionState, TargetSession};
use crate::stop::{StopReason, StopSender};

struct SessionSlot {
    label: String,
    state: SessionState,
    /// Distinguishes a reservation from a later one for the same id.
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

pub struct TargetRegistry {
    client: Arc<dyn ProtocolClient>,
    sink: Arc<RotatingLogSink>,
    stop: StopSender,
    /// Parent of every session's token.
    cancel: CancellationToken,
    sessions: Mutex<HashMap<String, SessionSlot>>,
    generations: AtomicU64,
}

impl std::fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("address", &self.client.address())
            .field("sessions", &self.ids())
            .finish()
    }
}

impl TargetRegistry {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        sink: Arc<RotatingLogSink>,
        stop: StopSender,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            sink,
            stop,
            cancel,
            sessions: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        })
    }

    /// Open and start a session for `target` unless its id is already known.
    ///
    /// Returns `Ok(true)` when a new session went live and `Ok(false)` when
    /// the id was present (or was removed while connecting). Connection and
    /// subscription errors release the reservation and are returned so the
    /// caller can skip the target; a persistence error is fatal.
    pub async fn add_if_absent(self: &Arc<Self>, target: TargetDescriptor) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        let id = target.id.clone();
        let label = target.label().to_string();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);

        {
            let mut sessions = self.lock();
            if sessions.contains_key(&id) {
                debug!(target_id = %id, "target already monitored");
                return Ok(false);
            }
            sessions.insert(
                id.clone(),
                SessionSlot {
                    label: label.clone(),
                    state: SessionState::Connecting,
                    generation,
                    cancel: self.cancel.child_token(),
                    task: None,
                },
            );
        }

        let mut session = match TargetSession::open(self.client.as_ref(), target).await {
            Ok(session) => session,
            Err(e) => {
                self.release_reservation(&id, generation);
                return Err(e);
            }
        };

        // The task is spawned and stored under the same lock that marks the
        // slot active, so a concurrent `remove` always finds a handle to wait
        // on. It starts consuming only once `New tab` is on disk.
        let (go, announced) = oneshot::channel::<()>();
        let spawned = {
            let mut sessions = self.lock();
            match sessions.get_mut(&id) {
                Some(slot) if slot.generation == generation && !slot.cancel.is_cancelled() => {
                    slot.state = SessionState::Active;
                    let registry = Arc::clone(self);
                    let task_id = id.clone();
                    let cancel = slot.cancel.clone();
                    slot.task = Some(tokio::spawn(async move {
                        let end = match announced.await {
                            Ok(()) => session.run(&registry.sink, cancel).await,
                            Err(_) => {
                                session.close().await;
                                SessionEnd::Cancelled
                            }
                        };
                        registry.session_ended(&task_id, generation, end).await;
                    }));
                    Ok(())
                }
                _ => Err(session),
            }
        };
        if let Err(mut session) = spawned {
            debug!(target_id = %id, "target removed while connecting");
            session.close().await;
            self.release_reservation(&id, generation);
            return Ok(false);
        }

        info!(target_id = %id, %label, "monitoring new target");
        let announcement = self
            .sink
            .append(&formatter::collector_entry(format!("New tab: {label}")))
            .await;
        if let Err(e) = announcement {
            let slot = self.take_slot(&id, generation);
            drop(go);
            if let Some(task) = slot.and_then(|mut slot| slot.task.take()) {
                join_session(&id, task).await;
            }
            return Err(e);
        }
        let _ = go.send(());
        Ok(true)
    }

    /// Drop the session for `id` and record its closure. Unknown ids are a
    /// silent no-op.
    ///
    /// The session records what the target already delivered before
    /// `Tab closed` is written.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let Some(mut slot) = self.lock().remove(id) else {
            return Ok(false);
        };
        slot.cancel.cancel();
        if let Some(task) = slot.task.take() {
            join_session(id, task).await;
        }
        self.record_closed(id, &slot).await
    }

    /// Cancel every session and wait until each has closed its connection.
    pub async fn close_all(&self) {
        let slots: Vec<(String, SessionSlot)> = self.lock().drain().collect();
        for (_, slot) in &slots {
            slot.cancel.cancel();
        }
        for (id, slot) in slots {
            if let Some(task) = slot.task {
                join_session(&id, task).await;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn state(&self, id: &str) -> Option<SessionState> {
        self.lock().get(id).map(|slot| slot.state)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn session_ended(&self, id: &str, generation: u64, end: SessionEnd) {
        match end {
            SessionEnd::Cancelled => {}
            SessionEnd::Disconnected => {
                let slot = self.take_slot(id, generation);
                if let Some(slot) = slot {
                    if let Err(e) = self.record_closed(id, &slot).await {
                        self.report(e);
                    }
                }
            }
            SessionEnd::Failed(e) => {
                self.take_slot(id, generation);
                self.report(e);
            }
        }
    }

    async fn record_closed(&self, id: &str, slot: &SessionSlot) -> Result<bool> {
        if slot.state != SessionState::Active {
            debug!(target_id = %id, "dropped reservation before it went live");
            return Ok(false);
        }
        info!(target_id = %id, label = %slot.label, "target closed");
        self.sink
            .append(&formatter::collector_entry(format!("Tab closed: {}", slot.label)))
            .await?;
        Ok(true)
    }

    fn report(&self, e: tablog_core::Error) {
        warn!(error = %e, "session failure");
        if e.is_fatal() {
            let _ = self.stop.send(StopReason::PersistenceFailed(e.to_string()));
        }
    }

    fn release_reservation(&self, id: &str, generation: u64) {
        self.take_slot(id, generation);
    }

    /// Remove the slot for `id` if it still belongs to `generation`.
    fn take_slot(&self, id: &str, generation: u64) -> Option<SessionSlot> {
        let mut sessions = self.lock();
        if sessions.get(id).is_some_and(|slot| slot.generation == generation) {
            sessions.remove(id)
        } else {
            None
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionSlot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn join_session(id: &str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!(target_id = %id, error = %e, "session task failed");
    }
}
