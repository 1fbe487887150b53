//! tablog-feeds — per-target event feeds for tablog.
//!
//! The [`client`] traits are the only way the collector talks to the host.
//! [`devtools`] implements them for a DevTools endpoint. A
//! [`TargetSession`] owns one target connection and pushes formatted entries
//! into the shared sink; the [`TargetRegistry`] keeps exactly one session
//! per live target.

pub mod client;
pub mod devtools;
pub mod registry;
pub mod session;
pub mod stop;

pub use client::{Connection, Discovery, DiscoveryEvent, ProtocolClient};
pub use devtools::DevtoolsClient;
pub use registry::TargetRegistry;
pub use session::{SessionEnd, SessionState, TargetSession};
pub use stop::{stop_channel, StopReason, StopReceiver, StopSender};
