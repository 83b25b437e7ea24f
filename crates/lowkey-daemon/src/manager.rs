//! Daemon manager
//!
//! Owns the watcher controller, the rotating change log, and the change
//! aggregator. Start is idempotent; stop flips the running and shutdown
//! flags before touching the controller so a supervisor probe firing
//! mid-stop cannot race-restart the manager. Manifest reconciliation swaps
//! in a freshly built controller and rolls back on failure.

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use lowkey_core::domain::{Heartbeat, Manifest, ManifestDiff, Summary, WatchError};
use lowkey_core::ignore::IgnoreSet;
use lowkey_core::{logline, paths};
use lowkey_store::{ManifestStore, RotatingLog};
use lowkey_telemetry::MetricsRegistry;
use lowkey_watch::controller::{ControllerConfig, WatcherController};
use lowkey_watch::monitor::ChangeSubscriber;
use lowkey_watch::ChangeAggregator;

use crate::supervisor::Supervisor;

/// Window used for the status summary.
const STATUS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Safety-scan cadence for daemon-managed controllers.
const DAEMON_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Snapshot returned by [`DaemonManager::status`]
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStatus {
    /// Whether the controller is live
    pub running: bool,
    /// Watched directories (copy of the live manifest)
    pub directories: Vec<PathBuf>,
    /// Where the manifest is persisted
    pub manifest_path: PathBuf,
    /// Aggregator snapshot over the last five minutes
    pub summary: Summary,
    /// Supervisor heartbeat
    pub heartbeat: Heartbeat,
}

struct ManagerState {
    running: bool,
    shutdown: bool,
    manifest: Manifest,
    controller: Option<WatcherController>,
    supervisor: Option<Supervisor>,
}

/// Owner of the controller, logger, and aggregator
pub struct DaemonManager {
    store: ManifestStore,
    state: Mutex<ManagerState>,
    logger: Arc<RotatingLog>,
    aggregator: Arc<ChangeAggregator>,
    heartbeat: Arc<StdMutex<Heartbeat>>,
    metrics: Option<Arc<MetricsRegistry>>,
    trace_changes: bool,
}

impl DaemonManager {
    /// Builds a manager for `manifest`, resolving the log location and the
    /// ignore set, and constructing the initial controller.
    ///
    /// # Errors
    /// Fails on an invalid manifest ([`WatchError::ConfigInvalid`]) or when
    /// the log file cannot be opened.
    pub fn new(
        store: ManifestStore,
        manifest: Manifest,
        metrics: Option<Arc<MetricsRegistry>>,
        trace_changes: bool,
    ) -> Result<Arc<Self>, WatchError> {
        manifest.validate()?;

        let log_path = manifest
            .log_path
            .clone()
            .unwrap_or_else(|| store.state_dir().join(paths::LOG_FILE));
        let logger = Arc::new(RotatingLog::open_default(log_path)?);

        let manager = Arc::new(Self {
            store,
            state: Mutex::new(ManagerState {
                running: false,
                shutdown: false,
                manifest: manifest.clone(),
                controller: None,
                supervisor: None,
            }),
            logger,
            aggregator: Arc::new(ChangeAggregator::new()),
            heartbeat: Arc::new(StdMutex::new(Heartbeat::default())),
            metrics,
            trace_changes,
        });

        // Build the initial controller eagerly so configuration problems
        // surface at construction time.
        let controller = manager.build_controller(&manifest)?;
        manager
            .state
            .try_lock()
            .expect("state lock free during construction")
            .controller = Some(controller);

        Ok(manager)
    }

    /// Starts the controller and the supervisor. Idempotent: a running
    /// manager returns success without doing anything.
    ///
    /// # Errors
    /// Propagates manifest persistence and controller start failures, and
    /// refuses to start a manager that is shutting down.
    pub async fn start(self: &Arc<Self>) -> Result<(), WatchError> {
        let mut state = self.state.lock().await;
        if state.shutdown {
            return Err(WatchError::ConfigInvalid(
                "manager is shut down".to_string(),
            ));
        }
        if state.running {
            return Ok(());
        }

        self.store.save(&state.manifest)?;

        let mut controller = match state.controller.take() {
            Some(controller) if controller.is_idle() => controller,
            _ => self.build_controller(&state.manifest)?,
        };
        controller.start()?;
        state.controller = Some(controller);
        state.running = true;

        info!(
            directories = state.manifest.directories.len(),
            manifest = %self.store.path().display(),
            "lowkey daemon started"
        );

        if state.supervisor.is_none() {
            let mut supervisor =
                Supervisor::new(Supervisor::DEFAULT_INTERVAL, Arc::clone(&self.heartbeat));
            supervisor.start(Arc::downgrade(self));
            state.supervisor = Some(supervisor);
        }

        Ok(())
    }

    /// Stops the controller and supervisor. The manager cannot be started
    /// again afterwards; stop on an un-started manager is a no-op.
    pub async fn stop(&self) {
        let (controller, supervisor) = {
            let mut state = self.state.lock().await;
            // Flags first: a supervisor probe between here and the
            // controller stop sees shutdown and refuses to restart.
            state.shutdown = true;
            state.running = false;
            (state.controller.take(), state.supervisor.take())
        };

        if let Some(mut controller) = controller {
            controller.stop().await;
        }
        if let Some(mut supervisor) = supervisor {
            supervisor.stop().await;
        }
        info!("lowkey daemon stopped");
    }

    /// Current status: running flag, directory copy, manifest path, a
    /// five-minute summary, and the supervisor heartbeat.
    pub async fn status(&self) -> ManagerStatus {
        let state = self.state.lock().await;
        ManagerStatus {
            running: state.running,
            directories: state.manifest.directories.clone(),
            manifest_path: self.store.path(),
            summary: self.aggregator.snapshot(STATUS_WINDOW),
            heartbeat: self.heartbeat.lock().expect("heartbeat lock").clone(),
        }
    }

    /// Reloads the on-disk manifest and applies the directory delta by
    /// rebuilding the controller.
    ///
    /// No manifest on disk is a no-op, as is an empty diff. On a start
    /// failure of the new controller the previous manifest and a
    /// controller for it are restored, and the original error propagates.
    pub async fn reconcile_manifest(&self) -> Result<ManifestDiff, WatchError> {
        let desired = match self.store.load()? {
            Some(desired) => desired,
            None => return Ok(ManifestDiff::default()),
        };
        desired.validate()?;

        let mut state = self.state.lock().await;
        let diff = state.manifest.diff(&desired);
        if diff.is_empty() {
            return Ok(diff);
        }

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Reconciling manifest"
        );

        // Build before swapping so a bad desired state leaves us untouched
        let new_controller = self.build_controller(&desired)?;
        let old_manifest = std::mem::replace(&mut state.manifest, desired);
        let old_controller = state.controller.replace(new_controller);

        if let Some(mut old) = old_controller {
            old.stop().await;
        }

        if state.running {
            let start_result = state
                .controller
                .as_mut()
                .expect("controller present after swap")
                .start();
            if let Err(e) = start_result {
                warn!(error = %e, "New controller failed to start; rolling back");
                state.manifest = old_manifest;
                match self.build_controller(&state.manifest) {
                    Ok(mut restored) => {
                        if let Err(restore_err) = restored.start() {
                            error!(
                                error = %restore_err,
                                "Failed to restart previous controller after rollback"
                            );
                            state.running = false;
                        }
                        state.controller = Some(restored);
                    }
                    Err(build_err) => {
                        error!(error = %build_err, "Failed to rebuild previous controller");
                        state.running = false;
                    }
                }
                return Err(e);
            }
        }

        self.store.save(&state.manifest)?;
        Ok(diff)
    }

    /// Whether the manager has been shut down.
    pub async fn is_shutdown(&self) -> bool {
        self.state.lock().await.shutdown
    }

    /// The rotating change log.
    pub fn logger(&self) -> &Arc<RotatingLog> {
        &self.logger
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn build_controller(&self, manifest: &Manifest) -> Result<WatcherController, WatchError> {
        let ignore = match &manifest.ignore_file {
            Some(path) => match IgnoreSet::from_file(path) {
                Ok(ignore) => ignore,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load ignore file");
                    IgnoreSet::empty()
                }
            },
            None => IgnoreSet::empty(),
        };

        let mut config = ControllerConfig::new(manifest.directories.clone());
        config.ignore = ignore;
        config.scan_interval = DAEMON_SCAN_INTERVAL;

        Ok(WatcherController::new(config)?
            .with_aggregator(Arc::clone(&self.aggregator))
            .with_subscriber(self.build_subscriber(manifest.directories.clone())))
    }

    /// The internal change handler: write the human log line, bump
    /// telemetry, and optionally emit a trace span.
    fn build_subscriber(&self, roots: Vec<PathBuf>) -> ChangeSubscriber {
        let logger = Arc::clone(&self.logger);
        let metrics = self.metrics.clone();
        let trace_changes = self.trace_changes;

        Arc::new(move |change| {
            let line = logline::format_line(change, &roots);
            if let Err(e) = logger.write_line(&line) {
                warn!(error = %e, "Failed to write change log line");
            }

            if let Some(metrics) = &metrics {
                metrics.record_event();
                let latency = (Utc::now() - change.timestamp)
                    .num_milliseconds()
                    .max(0) as f64
                    / 1000.0;
                metrics.observe_latency(latency);
            }

            if trace_changes {
                let span = tracing::trace_span!(
                    "change",
                    kind = %change.kind,
                    path = %change.path.display()
                );
                let _entered = span.enter();
                tracing::trace!("change observed");
            }
        })
    }
}
