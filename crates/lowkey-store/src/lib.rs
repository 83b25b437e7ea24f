//! Lowkey Store - persistent state
//!
//! Three small stores back the daemon:
//! - [`ManifestStore`] - atomic read/write of the watch manifest
//! - [`RotatingLog`] - append-only log writer with size-triggered rotation
//! - [`pid`] - PID file handling and process liveness probes

pub mod manifest;
pub mod pid;
pub mod rotating;

pub use manifest::ManifestStore;
pub use pid::{process_alive, read_pid, write_pid, PidGuard};
pub use rotating::RotatingLog;
