//! Hybrid monitor - event consumer plus periodic safety scan
//!
//! Backend events give low latency; the safety scan walks ground truth on
//! a slower cadence and reconciles anything the backend dropped. Both
//! tasks funnel through [`SignatureCache::upsert`], whose single critical
//! section decides create/modify/unchanged, so concurrent observations of
//! the same file can never double-emit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use lowkey_core::cache::{SignatureCache, SignatureUpdate};
use lowkey_core::domain::{compute_signature, Change, ChangeKind, FileSignature, WatchError};
use lowkey_core::ignore::IgnoreSet;

use crate::aggregator::ChangeAggregator;
use crate::backend::{BackendStreams, FsEvent, FsEventKind};

/// Default safety-scan cadence.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Callback invoked for every emitted change
///
/// Subscribers run inline on the monitor tasks; slow subscribers delay
/// event processing, and events dropped at the backend while a subscriber
/// stalls are recovered by the next safety scan rather than redelivered.
pub type ChangeSubscriber = Arc<dyn Fn(&Change) + Send + Sync>;

/// The monitoring engine driving one set of watched directories
pub struct HybridMonitor {
    directories: Vec<PathBuf>,
    cache: Arc<SignatureCache>,
    ignore: Arc<IgnoreSet>,
    aggregator: Option<Arc<ChangeAggregator>>,
    subscriber: Option<ChangeSubscriber>,
    scan_interval: Duration,
}

impl HybridMonitor {
    /// Creates a monitor over `directories` backed by `cache`.
    pub fn new(
        directories: Vec<PathBuf>,
        cache: Arc<SignatureCache>,
        ignore: Arc<IgnoreSet>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            directories,
            cache,
            ignore,
            aggregator: None,
            subscriber: None,
            scan_interval,
        }
    }

    /// Attaches an aggregator that records every emitted change.
    pub fn with_aggregator(mut self, aggregator: Arc<ChangeAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Attaches a subscriber callback.
    pub fn with_subscriber(mut self, subscriber: ChangeSubscriber) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Runs the event consumer and safety-scan tasks until cancellation.
    pub async fn run(self, streams: BackendStreams, cancel: CancellationToken) {
        info!(
            directories = self.directories.len(),
            scan_interval_s = self.scan_interval.as_secs(),
            "Hybrid monitor starting"
        );

        let consumer = self.consume_events(streams, cancel.clone());
        let scanner = self.scan_loop(cancel);
        tokio::join!(consumer, scanner);

        info!("Hybrid monitor stopped");
    }

    // ========================================================================
    // Event consumer
    // ========================================================================

    async fn consume_events(&self, mut streams: BackendStreams, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = streams.events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            debug!("Backend event stream closed");
                            break;
                        }
                    }
                }
                changed = streams.errors.changed() => {
                    match changed {
                        Ok(()) => {
                            if let Some(err) = streams.errors.borrow_and_update().clone() {
                                warn!(error = %err, "Backend error");
                            }
                        }
                        // Error sender gone means the backend is gone
                        Err(_) => break,
                    }
                }
            }
        }
    }

    /// Processes one backend event; classification runs before any cache
    /// mutation or emission.
    fn handle_event(&self, event: FsEvent) {
        if self.is_ignored(&event.path) {
            debug!(path = %event.path.display(), "Ignoring backend event");
            return;
        }

        match event.kind {
            FsEventKind::Delete => self.handle_delete(&event.path, &event),
            FsEventKind::Create | FsEventKind::Modify => {
                match std::fs::metadata(&event.path) {
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        // The file vanished before we could stat it
                        self.handle_delete(&event.path, &event);
                    }
                    Err(e) => {
                        warn!(path = %event.path.display(), error = %e, "stat failed; skipping event");
                    }
                    Ok(meta) => match compute_signature(&event.path, &meta) {
                        Ok(sig) => self.apply_signature(&event.path, sig, &event),
                        Err(e) => {
                            // Left uncached so the next scan retries it
                            warn!(path = %event.path.display(), error = %e, "Signature failed; skipping event");
                        }
                    },
                }
            }
            FsEventKind::Other(kind) => {
                self.emit(
                    Change::new(event.path.clone(), ChangeKind::Other(kind))
                        .at(event.timestamp),
                );
            }
        }
    }

    fn handle_delete(&self, path: &Path, event: &FsEvent) {
        if let Some(old) = self.cache.delete(path) {
            self.emit(
                Change::new(path.to_path_buf(), ChangeKind::Delete)
                    .with_old_size(old.size)
                    .at(event.timestamp),
            );
        }
    }

    fn apply_signature(&self, path: &Path, sig: FileSignature, event: &FsEvent) {
        let size = sig.size;
        match self.cache.upsert(path, sig) {
            SignatureUpdate::Created => {
                self.emit(
                    Change::new(path.to_path_buf(), ChangeKind::Create)
                        .with_size(size)
                        .at(event.timestamp),
                );
            }
            SignatureUpdate::Modified(old) => {
                self.emit(
                    Change::new(path.to_path_buf(), ChangeKind::Modify)
                        .with_size(size)
                        .with_old_size(old.size)
                        .at(event.timestamp),
                );
            }
            SignatureUpdate::Unchanged => {}
        }
    }

    // ========================================================================
    // Safety scan
    // ========================================================================

    async fn scan_loop(&self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.scan_interval;
        let mut ticker = tokio::time::interval_at(start, self.scan_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.safety_scan().await,
            }
        }
    }

    /// Walks every watched directory and reconciles the cache with ground
    /// truth: unseen files become CREATE, changed signatures MODIFY, and
    /// cached paths missing from the walk DELETE.
    pub async fn safety_scan(&self) {
        for dir in &self.directories {
            let pre_scan = self.cache.files_under(dir);

            let root = dir.clone();
            let ignore = Arc::clone(&self.ignore);
            let walked =
                tokio::task::spawn_blocking(move || scan_signatures(&root, &ignore)).await;
            let (current, errors) = match walked {
                Ok(result) => result,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Safety scan task panicked");
                    continue;
                }
            };
            for err in &errors {
                warn!(dir = %dir.display(), error = %err, "Safety scan error");
            }

            for (path, sig) in &current {
                match self.cache.upsert(path, sig.clone()) {
                    SignatureUpdate::Created => {
                        self.emit(
                            Change::new(path.clone(), ChangeKind::Create).with_size(sig.size),
                        );
                    }
                    SignatureUpdate::Modified(old) => {
                        self.emit(
                            Change::new(path.clone(), ChangeKind::Modify)
                                .with_size(sig.size)
                                .with_old_size(old.size),
                        );
                    }
                    SignatureUpdate::Unchanged => {}
                }
            }

            for (path, old) in &pre_scan {
                if !current.contains_key(path) {
                    if self.cache.delete(path).is_some() {
                        self.emit(
                            Change::new(path.clone(), ChangeKind::Delete)
                                .with_old_size(old.size),
                        );
                    }
                }
            }

            debug!(
                dir = %dir.display(),
                files = current.len(),
                "Safety scan pass complete"
            );
        }
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn emit(&self, change: Change) {
        if let Some(aggregator) = &self.aggregator {
            aggregator.record(&change);
        }
        info!(
            kind = %change.kind,
            path = %change.path.display(),
            size = change.size,
            "Change detected"
        );
        if let Some(subscriber) = &self.subscriber {
            subscriber(&change);
        }
    }

    /// Classifies a path against the ignore set, relative to its watch
    /// root when it has one.
    fn is_ignored(&self, path: &Path) -> bool {
        let rel = self
            .directories
            .iter()
            .find_map(|dir| path.strip_prefix(dir).ok())
            .unwrap_or(path);
        self.ignore.should_ignore(rel)
    }
}

/// Walks `root` computing signatures for every non-ignored regular file.
fn scan_signatures(
    root: &Path,
    ignore: &IgnoreSet,
) -> (HashMap<PathBuf, FileSignature>, Vec<WatchError>) {
    let mut current = HashMap::new();
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
        let rel = path.strip_prefix(root).unwrap_or(path);
        if ignore.should_ignore(rel) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                errors.push(WatchError::path_io(path, e));
                continue;
            }
        };
        match compute_signature(path, &meta) {
            Ok(sig) => {
                current.insert(path.to_path_buf(), sig);
            }
            Err(e) => errors.push(e),
        }
    }

    (current, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    fn collector() -> (ChangeSubscriber, Arc<Mutex<Vec<Change>>>) {
        let seen: Arc<Mutex<Vec<Change>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscriber: ChangeSubscriber =
            Arc::new(move |change: &Change| sink.lock().unwrap().push(change.clone()));
        (subscriber, seen)
    }

    fn monitor_for(
        dir: &Path,
        ignore: IgnoreSet,
    ) -> (HybridMonitor, Arc<Mutex<Vec<Change>>>) {
        let (subscriber, seen) = collector();
        let monitor = HybridMonitor::new(
            vec![dir.to_path_buf()],
            Arc::new(SignatureCache::new()),
            Arc::new(ignore),
            DEFAULT_SCAN_INTERVAL,
        )
        .with_subscriber(subscriber);
        (monitor, seen)
    }

    #[tokio::test]
    async fn test_first_scan_emits_only_creates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
        fs::write(dir.path().join("b.txt"), b"bbbb").unwrap();

        let (monitor, seen) = monitor_for(dir.path(), IgnoreSet::empty());
        monitor.safety_scan().await;

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Create));
    }

    #[tokio::test]
    async fn test_rescan_without_changes_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();

        let (monitor, seen) = monitor_for(dir.path(), IgnoreSet::empty());
        monitor.safety_scan().await;
        seen.lock().unwrap().clear();

        monitor.safety_scan().await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_detects_modification_with_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let (monitor, seen) = monitor_for(dir.path(), IgnoreSet::empty());
        monitor.safety_scan().await;
        seen.lock().unwrap().clear();

        fs::write(&path, b"hello world").unwrap();
        monitor.safety_scan().await;

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modify);
        assert_eq!(changes[0].size, Some(11));
        assert_eq!(changes[0].old_size, Some(5));
        assert_eq!(changes[0].size_delta, Some(6));
    }

    #[tokio::test]
    async fn test_scan_detects_deletion_and_evicts_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let cache = Arc::new(SignatureCache::new());
        let (subscriber, seen) = collector();
        let monitor = HybridMonitor::new(
            vec![dir.path().to_path_buf()],
            Arc::clone(&cache),
            Arc::new(IgnoreSet::empty()),
            DEFAULT_SCAN_INTERVAL,
        )
        .with_subscriber(subscriber);

        monitor.safety_scan().await;
        seen.lock().unwrap().clear();

        fs::remove_file(&path).unwrap();
        monitor.safety_scan().await;

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Delete);
        assert!(cache.get(&path).is_none());
    }

    #[tokio::test]
    async fn test_ignored_paths_never_emit_or_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), b"log").unwrap();
        fs::write(dir.path().join("app.rs"), b"code").unwrap();

        let ignore = IgnoreSet::new(vec!["**/*.log".to_string()]);
        let cache = Arc::new(SignatureCache::new());
        let (subscriber, seen) = collector();
        let monitor = HybridMonitor::new(
            vec![dir.path().to_path_buf()],
            Arc::clone(&cache),
            Arc::new(ignore),
            DEFAULT_SCAN_INTERVAL,
        )
        .with_subscriber(subscriber);

        monitor.safety_scan().await;

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, dir.path().join("app.rs"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_event_for_vanished_file_is_a_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost.txt");
        fs::write(&path, b"here").unwrap();

        let cache = Arc::new(SignatureCache::new());
        let (subscriber, seen) = collector();
        let monitor = HybridMonitor::new(
            vec![dir.path().to_path_buf()],
            Arc::clone(&cache),
            Arc::new(IgnoreSet::empty()),
            DEFAULT_SCAN_INTERVAL,
        )
        .with_subscriber(subscriber);

        monitor.safety_scan().await;
        seen.lock().unwrap().clear();
        fs::remove_file(&path).unwrap();

        // A MODIFY event arriving after the file vanished promotes to
        // DELETE, carrying the backend-supplied timestamp.
        let stamp = chrono::Utc::now() - chrono::Duration::seconds(3);
        monitor.handle_event(FsEvent {
            path: path.clone(),
            kind: FsEventKind::Modify,
            timestamp: stamp,
        });

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Delete);
        assert_eq!(changes[0].timestamp, stamp);
    }

    #[tokio::test]
    async fn test_duplicate_events_suppressed_by_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"same").unwrap();

        let (monitor, seen) = monitor_for(dir.path(), IgnoreSet::empty());
        let event = FsEvent {
            path: path.clone(),
            kind: FsEventKind::Create,
            timestamp: chrono::Utc::now(),
        };
        monitor.handle_event(event.clone());
        monitor.handle_event(event);

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Create);
    }

    #[tokio::test]
    async fn test_other_backend_kinds_forward_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, seen) = monitor_for(dir.path(), IgnoreSet::empty());

        monitor.handle_event(FsEvent {
            path: dir.path().join("x"),
            kind: FsEventKind::Other("RENAMED".to_string()),
            timestamp: chrono::Utc::now(),
        });

        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Other("RENAMED".to_string()));
    }
}
