//! lowkeyd - the background monitoring daemon
//!
//! Spawned by `lowkey start` with the environment contract from
//! [`lowkey_daemon::env`], or run by hand. Loads the persisted manifest,
//! claims the PID file, starts the supervised manager, and runs until
//! SIGTERM/SIGINT.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lowkey_core::paths;
use lowkey_daemon::env;
use lowkey_daemon::DaemonManager;
use lowkey_store::{write_pid, ManifestStore};
use lowkey_telemetry::{MetricsRegistry, MetricsServer};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("daemon: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let state_dir = match env::manifest_path() {
        Some(manifest) => manifest
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(paths::state_dir),
        None => paths::state_dir(),
    };

    info!(
        state_dir = %state_dir.display(),
        daemon_child = env::is_daemon_child(),
        "lowkeyd starting"
    );

    let _pid_guard = write_pid(&state_dir.join(paths::PID_FILE))?;

    let store = ManifestStore::new(state_dir);
    let manifest = store
        .load()?
        .context("no manifest found; run `lowkey start <dir>` first")?;

    let shutdown = CancellationToken::new();

    // Optional metrics endpoint
    let metrics = match env::metrics_addr() {
        Some(addr) => {
            let registry = Arc::new(MetricsRegistry::new()?);
            let server = MetricsServer::bind(Arc::clone(&registry), &addr).await?;
            info!(addr = %server.local_addr()?, "Serving metrics");
            tokio::spawn(server.serve(shutdown.clone()));
            Some(registry)
        }
        None => None,
    };

    let manager = DaemonManager::new(store, manifest, metrics, env::trace_enabled())?;
    manager.start().await?;

    signal_loop(&manager).await;
    info!("Shutdown signal received");

    manager.stop().await;
    shutdown.cancel();
    Ok(())
}

/// Runs until a termination signal arrives. SIGHUP triggers a manifest
/// reconcile instead of exiting.
#[cfg(unix)]
async fn signal_loop(manager: &std::sync::Arc<DaemonManager>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    let mut hup = signal(SignalKind::hangup()).expect("install SIGHUP handler");

    loop {
        tokio::select! {
            _ = term.recv() => break,
            _ = int.recv() => break,
            _ = hup.recv() => {
                info!("SIGHUP received; reconciling manifest");
                match manager.reconcile_manifest().await {
                    Ok(diff) if diff.is_empty() => info!("Manifest unchanged"),
                    Ok(diff) => info!(
                        added = diff.added.len(),
                        removed = diff.removed.len(),
                        "Manifest reconciled"
                    ),
                    Err(e) => warn!(error = %e, "Manifest reconcile failed"),
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn signal_loop(_manager: &std::sync::Arc<DaemonManager>) {
    let _ = tokio::signal::ctrl_c().await;
}
