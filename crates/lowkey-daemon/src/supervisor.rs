//! Supervisor - periodic health probe with exponential backoff
//!
//! Probes the manager on a fixed cadence, restarts it when it is down, and
//! publishes a heartbeat. The manager owns the supervisor; the supervisor
//! only holds a weak handle back, so dropping the manager ends the probe
//! loop naturally.

use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lowkey_core::domain::Heartbeat;

use crate::manager::DaemonManager;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Probe loop handle publishing a [`Heartbeat`]
pub struct Supervisor {
    interval: Duration,
    heartbeat: Arc<StdMutex<Heartbeat>>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Supervisor {
    /// Default probe cadence.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    /// Creates a supervisor publishing into `heartbeat`.
    pub fn new(interval: Duration, heartbeat: Arc<StdMutex<Heartbeat>>) -> Self {
        Self {
            interval,
            heartbeat,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Starts the probe loop. Idempotent: a running supervisor is left
    /// alone.
    pub fn start(&mut self, manager: Weak<DaemonManager>) {
        if self.task.is_some() {
            return;
        }
        info!(interval_s = self.interval.as_secs(), "Supervisor starting");
        self.task = Some(tokio::spawn(probe_loop(
            manager,
            Arc::clone(&self.heartbeat),
            self.interval,
            self.cancel.clone(),
        )));
    }

    /// Cancels the probe loop and waits for it to finish. Idempotent.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Supervisor task join failed");
            }
            info!("Supervisor stopped");
        }
    }

    /// Copy of the current heartbeat.
    pub fn heartbeat(&self) -> Heartbeat {
        self.heartbeat.lock().expect("heartbeat lock").clone()
    }
}

async fn probe_loop(
    manager: Weak<DaemonManager>,
    heartbeat: Arc<StdMutex<Heartbeat>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let delay = match manager.upgrade() {
            // Manager dropped; nothing left to supervise
            None => break,
            Some(manager) => probe_once(&manager, &heartbeat, interval, &mut backoff).await,
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!("Supervisor probe loop exited");
}

/// One probe pass. Returns how long to sleep before the next one: the
/// regular interval when healthy, the backoff window after a failed start.
async fn probe_once(
    manager: &Arc<DaemonManager>,
    heartbeat: &Arc<StdMutex<Heartbeat>>,
    interval: Duration,
    backoff: &mut Duration,
) -> Duration {
    let now = Utc::now();
    {
        let mut hb = heartbeat.lock().expect("heartbeat lock");
        hb.last_check = Some(now);
        hb.last_error.clear();
        hb.backoff_until = None;
    }

    if manager.status().await.running {
        let mut hb = heartbeat.lock().expect("heartbeat lock");
        if !hb.running {
            hb.last_change = Some(now);
        }
        hb.running = true;
        *backoff = INITIAL_BACKOFF;
        return interval;
    }

    if manager.is_shutdown().await {
        // Mid-shutdown; leave the stopped manager alone
        heartbeat.lock().expect("heartbeat lock").running = false;
        return interval;
    }

    match manager.start().await {
        Ok(()) => {
            info!("Supervisor restarted the manager");
            let mut hb = heartbeat.lock().expect("heartbeat lock");
            hb.running = true;
            hb.restarts += 1;
            hb.last_change = Some(now);
            *backoff = INITIAL_BACKOFF;
            interval
        }
        Err(e) => {
            let delay = *backoff;
            warn!(error = %e, backoff_s = delay.as_secs(), "Manager restart failed");
            let mut hb = heartbeat.lock().expect("heartbeat lock");
            hb.running = false;
            hb.last_error = e.to_string();
            hb.backoff_until =
                Some(now + chrono::Duration::from_std(delay).expect("backoff fits"));
            *backoff = (*backoff * 2).min(BACKOFF_CAP);
            delay
        }
    }
}
