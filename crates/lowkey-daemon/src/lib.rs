//! Lowkey Daemon - supervised background monitoring
//!
//! The [`DaemonManager`] owns the watcher controller, the rotating change
//! log, and the aggregator; the [`Supervisor`] probes it and restarts it
//! with exponential backoff when it goes down. The `lowkeyd` binary wires
//! both to the environment contract the CLI uses when spawning the daemon.

pub mod env;
pub mod manager;
pub mod supervisor;

pub use manager::{DaemonManager, ManagerStatus};
pub use supervisor::Supervisor;
