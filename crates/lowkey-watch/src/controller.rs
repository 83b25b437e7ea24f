//! Watcher controller - lifecycle owner for one monitoring run
//!
//! Owns the backend, the signature cache, and the monitor task. A
//! controller is single-use: once stopped it stays closed, and higher
//! layers rebuild a fresh one to change configuration (see manifest
//! reconciliation in the daemon).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lowkey_core::cache::SignatureCache;
use lowkey_core::domain::{Change, ChangeKind, WatchError};
use lowkey_core::ignore::IgnoreSet;

use crate::aggregator::ChangeAggregator;
use crate::backend::{new_default_backend, EventBackend, DEFAULT_BACKEND_INTERVAL};
use crate::monitor::{ChangeSubscriber, HybridMonitor, DEFAULT_SCAN_INTERVAL};

/// Configuration for a [`WatcherController`]
#[derive(Clone)]
pub struct ControllerConfig {
    /// Directories to watch; must be non-empty
    pub directories: Vec<PathBuf>,
    /// Ignore classifier applied to every observation
    pub ignore: IgnoreSet,
    /// Safety-scan cadence
    pub scan_interval: Duration,
    /// Backend polling cadence
    pub backend_interval: Duration,
}

impl ControllerConfig {
    /// Config with default intervals.
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self {
            directories,
            ignore: IgnoreSet::empty(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            backend_interval: DEFAULT_BACKEND_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Closed,
}

/// Owns one backend + cache + monitor run
pub struct WatcherController {
    config: ControllerConfig,
    cache: Arc<SignatureCache>,
    aggregator: Option<Arc<ChangeAggregator>>,
    subscriber: Option<ChangeSubscriber>,
    cancel: CancellationToken,
    backend: Option<Box<dyn EventBackend>>,
    task: Option<tokio::task::JoinHandle<()>>,
    phase: Phase,
}

impl WatcherController {
    /// Creates a controller.
    ///
    /// # Errors
    /// Returns [`WatchError::ConfigInvalid`] when the directory set is
    /// empty.
    pub fn new(config: ControllerConfig) -> Result<Self, WatchError> {
        if config.directories.is_empty() {
            return Err(WatchError::ConfigInvalid(
                "no directories to watch".to_string(),
            ));
        }
        Ok(Self {
            config,
            cache: Arc::new(SignatureCache::new()),
            aggregator: None,
            subscriber: None,
            cancel: CancellationToken::new(),
            backend: None,
            task: None,
            phase: Phase::Idle,
        })
    }

    /// Attaches an aggregator; it receives the synthetic BOOT record and
    /// every change.
    pub fn with_aggregator(mut self, aggregator: Arc<ChangeAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Attaches a change subscriber callback.
    pub fn with_subscriber(mut self, subscriber: ChangeSubscriber) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Shared handle to the signature cache.
    pub fn cache(&self) -> Arc<SignatureCache> {
        Arc::clone(&self.cache)
    }

    /// The configured watch directories.
    pub fn directories(&self) -> &[PathBuf] {
        &self.config.directories
    }

    /// Whether the monitor task is live.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Whether the controller has never been started and still can be.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Builds the backend, registers every directory, and spawns the
    /// monitor task. Records a synthetic BOOT change in the aggregator.
    ///
    /// # Errors
    /// Fails when the controller was already started or stopped, or when
    /// any directory cannot be registered ([`WatchError::BackendAddFailed`]
    /// / [`WatchError::NotADirectory`]); a registration failure aborts the
    /// whole start.
    pub fn start(&mut self) -> Result<(), WatchError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Running => {
                return Err(WatchError::ConfigInvalid(
                    "controller already started".to_string(),
                ))
            }
            Phase::Closed => {
                return Err(WatchError::ConfigInvalid(
                    "controller is closed; build a new one".to_string(),
                ))
            }
        }

        let (mut backend, streams) = new_default_backend(self.config.backend_interval)?;
        for dir in &self.config.directories {
            if let Err(e) = backend.add(dir) {
                backend.close();
                return Err(e);
            }
        }

        let mut monitor = HybridMonitor::new(
            self.config.directories.clone(),
            Arc::clone(&self.cache),
            Arc::new(self.config.ignore.clone()),
            self.config.scan_interval,
        );
        if let Some(aggregator) = &self.aggregator {
            monitor = monitor.with_aggregator(Arc::clone(aggregator));
        }
        if let Some(subscriber) = &self.subscriber {
            monitor = monitor.with_subscriber(Arc::clone(subscriber));
        }

        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(monitor.run(streams, cancel)));
        self.backend = Some(backend);
        self.phase = Phase::Running;

        if let Some(aggregator) = &self.aggregator {
            aggregator.record(&Change::new(PathBuf::new(), ChangeKind::Boot));
        }

        info!(
            directories = self.config.directories.len(),
            "Watcher controller started"
        );
        Ok(())
    }

    /// Cancels the monitor, closes the backend, and joins the task. The
    /// controller is closed afterwards and cannot be restarted.
    pub async fn stop(&mut self) {
        if self.phase != Phase::Running {
            self.phase = Phase::Closed;
            return;
        }

        self.cancel.cancel();
        if let Some(mut backend) = self.backend.take() {
            backend.close();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Monitor task join failed");
            }
        }
        self.phase = Phase::Closed;
        info!("Watcher controller stopped");
    }
}

impl Drop for WatcherController {
    fn drop(&mut self) {
        // Tasks observe the token; a controller dropped without stop()
        // must not leave the monitor running
        self.cancel.cancel();
        if let Some(mut backend) = self.backend.take() {
            backend.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_directories_rejected() {
        let result = WatcherController::new(ControllerConfig::new(Vec::new()));
        assert!(matches!(result, Err(WatchError::ConfigInvalid(_))));
    }

    #[tokio::test]
    async fn test_start_records_boot_change() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = Arc::new(ChangeAggregator::new());

        let mut controller =
            WatcherController::new(ControllerConfig::new(vec![dir.path().to_path_buf()]))
                .unwrap()
                .with_aggregator(Arc::clone(&aggregator));

        controller.start().unwrap();
        assert!(controller.is_running());
        assert_eq!(aggregator.count(), 1);

        let summary = aggregator.snapshot(Duration::from_secs(300));
        assert_eq!(summary.last_change.unwrap().kind, ChangeKind::Boot);

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_start_fails_for_missing_directory() {
        let mut controller = WatcherController::new(ControllerConfig::new(vec![
            PathBuf::from("/no/such/dir"),
        ]))
        .unwrap();

        assert!(controller.start().is_err());
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_controller_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller =
            WatcherController::new(ControllerConfig::new(vec![dir.path().to_path_buf()]))
                .unwrap();

        controller.start().unwrap();
        assert!(controller.start().is_err());

        controller.stop().await;
        assert!(controller.start().is_err());
    }

    #[tokio::test]
    async fn test_stop_before_start_closes() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller =
            WatcherController::new(ControllerConfig::new(vec![dir.path().to_path_buf()]))
                .unwrap();

        controller.stop().await;
        assert!(controller.start().is_err());
    }
}
