//! Event backend contract
//!
//! A backend produces raw filesystem events for watched directories. The
//! monitor consumes them through channels handed out at construction:
//! events over a bounded mpsc channel (emission is non-blocking; overflow
//! drops events, which the safety scan later reconciles) and errors over a
//! single-slot watch channel where a newer error overwrites an unread one.
//!
//! Native OS backends plug in behind the same contract; the polling
//! implementation in [`polling`] is the one lowkey ships.

pub mod polling;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use lowkey_core::domain::WatchError;

pub use polling::PollingBackend;

/// Default polling cadence for the shipped backend.
pub const DEFAULT_BACKEND_INTERVAL: Duration = Duration::from_millis(1500);

/// Raw filesystem event delivered by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// Absolute path the event applies to
    pub path: PathBuf,
    /// What the backend observed
    pub kind: FsEventKind,
    /// Emission time, UTC
    pub timestamp: DateTime<Utc>,
}

/// Backend-level event kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEventKind {
    /// A file appeared
    Create,
    /// A file's signature changed
    Modify,
    /// A file disappeared
    Delete,
    /// Backend-specific kind, forwarded verbatim to subscribers
    Other(String),
}

/// Receiving side of a backend's channels
pub struct BackendStreams {
    /// Bounded event stream; `None` means the backend closed
    pub events: mpsc::Receiver<FsEvent>,
    /// Latest unconsumed backend error, single-slot overwrite
    pub errors: watch::Receiver<Option<WatchError>>,
}

/// Contract every event backend implements
///
/// Watch registration is directory-granular. `close` releases resources
/// and terminates both streams; the backend is unusable afterwards.
pub trait EventBackend: Send {
    /// Begins watching a directory subtree.
    ///
    /// # Errors
    /// Returns [`WatchError::NotADirectory`] when `path` is not a
    /// directory, and [`WatchError::BackendAddFailed`] when the subtree
    /// cannot be read.
    fn add(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Stops watching a directory. Unknown paths are a no-op.
    fn remove(&mut self, path: &Path);

    /// Releases resources and terminates the event and error streams.
    fn close(&mut self);
}

/// Constructs the platform-default backend.
///
/// Native variants (inotify, FSEvents, ReadDirectoryChangesW) slot in here
/// per platform; every platform currently gets the polling backend.
pub fn new_default_backend(
    interval: Duration,
) -> Result<(Box<dyn EventBackend>, BackendStreams), WatchError> {
    let (backend, streams) = PollingBackend::new(interval);
    Ok((Box::new(backend), streams))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_backend_is_constructible() {
        let (mut backend, _streams) = new_default_backend(DEFAULT_BACKEND_INTERVAL).unwrap();
        backend.close();
    }
}
