//! Polling event backend
//!
//! Keeps a signature snapshot per watched directory and diffs it against a
//! fresh walk on every tick. Event emission never blocks: when the bounded
//! channel is full the event is dropped and the next safety scan picks the
//! change up from ground truth.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use lowkey_core::domain::{compute_signature, FileSignature, WatchError};

use super::{BackendStreams, EventBackend, FsEvent, FsEventKind};

/// Bound of the event channel; overflow drops events.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

type DirSnapshot = HashMap<PathBuf, FileSignature>;

/// Polling implementation of [`EventBackend`]
pub struct PollingBackend {
    watched: Arc<Mutex<HashMap<PathBuf, DirSnapshot>>>,
    error_tx: watch::Sender<Option<WatchError>>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
    closed: bool,
}

impl PollingBackend {
    /// Creates the backend and spawns its ticker task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(interval: Duration) -> (Self, BackendStreams) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = watch::channel(None);

        let watched: Arc<Mutex<HashMap<PathBuf, DirSnapshot>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();

        info!(interval_ms = interval.as_millis() as u64, "Starting polling backend");

        let task = tokio::spawn(ticker_loop(
            interval,
            Arc::clone(&watched),
            event_tx,
            error_tx.clone(),
            cancel.clone(),
        ));

        (
            Self {
                watched,
                error_tx,
                cancel,
                task: Some(task),
                closed: false,
            },
            BackendStreams {
                events: event_rx,
                errors: error_rx,
            },
        )
    }
}

impl EventBackend for PollingBackend {
    fn add(&mut self, path: &Path) -> Result<(), WatchError> {
        if self.closed {
            return Err(WatchError::backend_add(path, "backend is closed"));
        }

        let meta = std::fs::metadata(path).map_err(|e| WatchError::backend_add(path, e))?;
        if !meta.is_dir() {
            return Err(WatchError::not_a_directory(path));
        }

        let (snapshot, errors) = walk_signatures(path);
        for err in errors {
            self.error_tx.send_replace(Some(err));
        }

        debug!(
            path = %path.display(),
            files = snapshot.len(),
            "Polling backend watching directory"
        );
        self.watched
            .lock()
            .expect("watched lock poisoned")
            .insert(path.to_path_buf(), snapshot);
        Ok(())
    }

    fn remove(&mut self, path: &Path) {
        if self
            .watched
            .lock()
            .expect("watched lock poisoned")
            .remove(path)
            .is_some()
        {
            debug!(path = %path.display(), "Polling backend stopped watching directory");
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        self.watched.lock().expect("watched lock poisoned").clear();
        if let Some(task) = self.task.take() {
            // The ticker observes the token; dropping the handle is enough
            drop(task);
        }
        info!("Polling backend closed");
    }
}

impl Drop for PollingBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Ticker task: on every tick, re-walk each watched directory and emit the
/// diff against the stored snapshot.
async fn ticker_loop(
    interval: Duration,
    watched: Arc<Mutex<HashMap<PathBuf, DirSnapshot>>>,
    event_tx: mpsc::Sender<FsEvent>,
    error_tx: watch::Sender<Option<WatchError>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                poll_once(&watched, &event_tx, &error_tx).await;
            }
        }
    }
    debug!("Polling backend ticker stopped");
}

async fn poll_once(
    watched: &Arc<Mutex<HashMap<PathBuf, DirSnapshot>>>,
    event_tx: &mpsc::Sender<FsEvent>,
    error_tx: &watch::Sender<Option<WatchError>>,
) {
    let dirs: Vec<PathBuf> = watched
        .lock()
        .expect("watched lock poisoned")
        .keys()
        .cloned()
        .collect();

    for dir in dirs {
        let walk_root = dir.clone();
        let walked =
            tokio::task::spawn_blocking(move || walk_signatures(&walk_root)).await;
        let (current, errors) = match walked {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Walk task panicked");
                continue;
            }
        };
        for err in errors {
            error_tx.send_replace(Some(err));
        }

        let mut guard = watched.lock().expect("watched lock poisoned");
        let previous = match guard.get_mut(&dir) {
            Some(previous) => previous,
            // Removed while we were walking
            None => continue,
        };

        for (path, sig) in &current {
            match previous.get(path) {
                None => emit(event_tx, path.clone(), FsEventKind::Create),
                Some(prev) if prev != sig => {
                    emit(event_tx, path.clone(), FsEventKind::Modify)
                }
                Some(_) => {}
            }
        }
        for path in previous.keys() {
            if !current.contains_key(path) {
                emit(event_tx, path.clone(), FsEventKind::Delete);
            }
        }

        *previous = current;
    }
}

/// Non-blocking emission; a full channel drops the event.
fn emit(event_tx: &mpsc::Sender<FsEvent>, path: PathBuf, kind: FsEventKind) {
    let event = FsEvent {
        path,
        kind,
        timestamp: Utc::now(),
    };
    if let Err(e) = event_tx.try_send(event) {
        debug!(error = %e, "Dropping backend event (channel full or closed)");
    }
}

/// Walks a subtree and computes signatures for every regular file.
///
/// Per-entry failures are collected rather than aborting the walk; the
/// caller forwards them to the error channel.
fn walk_signatures(root: &Path) -> (DirSnapshot, Vec<WatchError>) {
    let mut snapshot = DirSnapshot::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                errors.push(WatchError::BackendTransient(e.to_string()));
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                errors.push(WatchError::path_io(path, e));
                continue;
            }
        };
        match compute_signature(path, &meta) {
            Ok(sig) => {
                snapshot.insert(path.to_path_buf(), sig);
            }
            Err(e) => errors.push(e),
        }
    }

    (snapshot, errors)
}
