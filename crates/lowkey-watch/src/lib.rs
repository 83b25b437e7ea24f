//! Lowkey Watch - the hybrid monitoring engine
//!
//! Combines a pluggable event backend with a periodic safety scan so that
//! dropped or missed backend events are always reconciled against ground
//! truth.
//!
//! ## Architecture
//!
//! ```text
//! EventBackend ──→ mpsc::channel ──→ HybridMonitor ──→ Aggregator
//!      ▲                                  │        ──→ subscriber callback
//!      │                            SignatureCache
//! WatcherController ── safety scan ───────┘
//! ```
//!
//! The [`WatcherController`] owns the backend, cache, and monitor task and
//! exposes the start/stop lifecycle the daemon layers build on.

pub mod aggregator;
pub mod backend;
pub mod controller;
pub mod monitor;

pub use aggregator::ChangeAggregator;
pub use backend::{new_default_backend, BackendStreams, EventBackend, FsEvent, FsEventKind};
pub use controller::{ControllerConfig, WatcherController};
pub use monitor::{ChangeSubscriber, HybridMonitor};
