//! Target session — one live connection to one target.
//!
//! [`TargetSession::open`] connects and enables the protocol domains;
//! [`TargetSession::run`] then consumes the target's notifications in
//! delivery order, formats them and appends the results to the sink until
//! the target disconnects or the session is cancelled. A cancelled session
//! still records every event the target had already delivered before it
//! closes the connection. Sessions never
//! reconnect: a target that drops is gone, and only a new target id brings
//! coverage back.

use futures::FutureExt;
use tablog_core::{
    formatter, Domain, Error, FeedEvent, ProtocolEvent, Result, RotatingLogSink,
    TargetDescriptor,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{Connection, ProtocolClient};

/// Lifecycle of a session as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Id reserved, connection or domain enabling in flight.
    Connecting,
    /// Domains enabled, events flowing.
    Active,
    /// Connection released.
    Closed,
}

/// How a session's run loop ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The target went away.
    Disconnected,
    /// Shutdown or removal requested it.
    Cancelled,
    /// The sink failed; the collector must stop.
    Failed(Error),
}

pub struct TargetSession {
    target: TargetDescriptor,
    connection: Box<dyn Connection>,
    network: bool,
    state: SessionState,
}

impl std::fmt::Debug for TargetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetSession")
            .field("id", &self.target.id)
            .field("label", &self.target.label())
            .field("network", &self.network)
            .field("state", &self.state)
            .finish()
    }
}

impl TargetSession {
    /// Connect to `target` and enable its domains.
    ///
    /// `Runtime` and `Log` must enable; `Network` may fail, in which case the
    /// session runs without network coverage.
    pub async fn open(client: &dyn ProtocolClient, target: TargetDescriptor) -> Result<Self> {
        let mut connection = client.connect(&target).await?;
        let mut network = false;

        for domain in Domain::ALL {
            match connection.enable(domain).await {
                Ok(()) => network |= domain == Domain::Network,
                Err(e) if !domain.is_required() => {
                    debug!(target_id = %target.id, %domain, error = %e, "continuing without domain");
                }
                Err(e) => {
                    close_quietly(connection.as_mut(), &target.id).await;
                    return Err(Error::Subscription {
                        domain: domain.to_string(),
                        target: target.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(target_id = %target.id, label = target.label(), network, "session active");
        Ok(Self {
            target,
            connection,
            network,
            state: SessionState::Active,
        })
    }

    pub fn id(&self) -> &str {
        &self.target.id
    }

    pub fn label(&self) -> &str {
        self.target.label()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the `Network` domain enabled.
    pub fn has_network(&self) -> bool {
        self.network
    }

    /// Consume notifications until disconnect, cancellation or a sink failure.
    pub async fn run(mut self, sink: &RotatingLogSink, cancel: CancellationToken) -> SessionEnd {
        let end = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                event = self.connection.next_event() => Some(event),
            };
            let event = match next {
                None => {
                    let end = self.drain(sink).await;
                    self.close().await;
                    break end;
                }
                Some(None) => break SessionEnd::Disconnected,
                Some(Some(event)) => event,
            };

            if let Some(entry) = self.format(&event) {
                if let Err(e) = sink.append(&entry).await {
                    self.close().await;
                    break SessionEnd::Failed(e);
                }
            }
        };
        self.state = SessionState::Closed;
        debug!(target_id = %self.target.id, ?end, "session ended");
        end
    }

    /// Close the connection. Errors are traced and ignored.
    pub async fn close(&mut self) {
        if self.state != SessionState::Closed {
            close_quietly(self.connection.as_mut(), &self.target.id).await;
            self.state = SessionState::Closed;
        }
    }

    /// Record the events already queued on the connection without waiting
    /// for new ones.
    async fn drain(&mut self, sink: &RotatingLogSink) -> SessionEnd {
        let mut drained = 0usize;
        while let Some(Some(event)) = self.connection.next_event().now_or_never() {
            drained += 1;
            if let Some(entry) = self.format(&event) {
                if let Err(e) = sink.append(&entry).await {
                    return SessionEnd::Failed(e);
                }
            }
        }
        if drained > 0 {
            debug!(target_id = %self.target.id, drained, "recorded queued events after cancellation");
        }
        SessionEnd::Cancelled
    }

    fn format(&self, event: &ProtocolEvent) -> Option<tablog_core::LogEntry> {
        let tab = Some(self.target.label()).filter(|label| !label.is_empty());
        match FeedEvent::decode(event) {
            Ok(Some(decoded)) => formatter::format_event(&decoded, tab),
            Ok(None) => None,
            Err(e) => {
                warn!(target_id = %self.target.id, error = %e, "dropping malformed event");
                None
            }
        }
    }
}

/// Close a connection, tracing and swallowing any error.
pub(crate) async fn close_quietly(connection: &mut dyn Connection, target_id: &str) {
    if let Err(e) = connection.close().await {
        debug!(%target_id, error = %e, "error while closing connection (ignored)");
    }
}
