//! tablog-core — types and pipeline leaves for the tab log collector.
//!
//! This crate holds everything that does not speak the wire protocol: the
//! canonical [`LogEntry`], the pure entry formatter, the rotating sink, the
//! lock artifact, configuration and the shared error taxonomy.
//!
//! # Architecture
//!
//! ```text
//! ProtocolEvent ──► FeedEvent::decode ──► formatter ──► RotatingLogSink
//! ```
//!
//! Every session funnels into one shared sink; the sink's lock is the only
//! point where sessions meet.

pub mod config;
pub mod error;
pub mod events;
pub mod formatter;
pub mod lockfile;
pub mod sink;
pub mod types;

pub use error::{Error, Result};
pub use events::{Domain, FeedEvent, ProtocolEvent};
pub use sink::RotatingLogSink;
pub use types::{Category, LogEntry, LogLevel, TargetDescriptor};
