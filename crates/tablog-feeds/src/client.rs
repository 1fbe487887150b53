//! Protocol client capability — the seam between the collector and whatever
//! speaks the wire protocol.
//!
//! The collector never frames requests or parses transport messages itself.
//! It lists targets, connects to one, enables domains, and pulls raw
//! notifications through these traits. [`crate::devtools`] is the production
//! implementation; tests substitute an in-memory host.

use async_trait::async_trait;
use tablog_core::{Domain, ProtocolEvent, Result, TargetDescriptor};

/// Host-level operations.
#[async_trait]
pub trait ProtocolClient: Send + Sync + 'static {
    /// Every target the host currently exposes, of any type.
    async fn list_targets(&self) -> Result<Vec<TargetDescriptor>>;

    /// Open an exclusive connection to one target.
    async fn connect(&self, target: &TargetDescriptor) -> Result<Box<dyn Connection>>;

    /// Lightweight reachability check, independent of any target.
    async fn probe_version(&self) -> Result<()>;

    /// Start a long-lived target creation/destruction subscription.
    async fn discover(&self) -> Result<Box<dyn Discovery>>;

    /// Human-readable host address for diagnostics.
    fn address(&self) -> String;
}

/// One live connection to one target.
#[async_trait]
pub trait Connection: Send {
    /// Turn on the notifications of one domain.
    async fn enable(&mut self, domain: Domain) -> Result<()>;

    /// Next notification in delivery order. `None` means the target
    /// disconnected; no further events will arrive.
    async fn next_event(&mut self) -> Option<ProtocolEvent>;

    async fn close(&mut self) -> Result<()>;
}

/// A target appearing or disappearing.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    Created(TargetDescriptor),
    Destroyed(String),
}

/// Long-lived discovery subscription.
#[async_trait]
pub trait Discovery: Send {
    /// `None` once the subscription is gone.
    async fn next(&mut self) -> Option<DiscoveryEvent>;

    async fn close(&mut self) -> Result<()>;
}
