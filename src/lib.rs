//! tablog — Tab Log collector
//!
//! Attaches to a browser's remote-debugging endpoint, follows every page
//! target as it comes and goes, and appends console output, uncaught
//! exceptions, browser log entries and failed network activity to a
//! size-rotated JSONL file. This crate holds the supervisor and the host
//! liveness monitor; the record format lives in `tablog-core` and the
//! protocol plumbing in `tablog-feeds`.
//!
//! # Architecture
//!
//! ```text
//! DevtoolsClient ──► TargetRegistry ──► TargetSession ×N ──► formatter ──► RotatingLogSink
//!       │                  ▲                                                   ▲
//!       ├──► Discovery ────┘                                                   │
//!       └──► LivenessMonitor ──────────────────────────────────────────────────┘
//! ```
//!
//! Every background task is owned by the [`collector::Collector`] and stops
//! when its cancellation token fires. Stop requests reach the collector over
//! one `tokio` channel as a [`tablog_feeds::StopReason`].

pub mod collector;
pub mod liveness;

pub use collector::Collector;
pub use liveness::LivenessMonitor;
