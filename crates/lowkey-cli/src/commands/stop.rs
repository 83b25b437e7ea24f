//! Stop the background daemon
//!
//! Sends SIGTERM and waits for the shutdown grace period; a daemon that
//! does not exit in time gets SIGKILL.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use tracing::{info, warn};

use lowkey_store::{process_alive, read_pid};

use crate::context::CliContext;

/// How long the daemon gets to exit after the polite signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Stop the background daemon
#[derive(Debug, Args)]
pub struct StopCommand {}

impl StopCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        let pid = match read_pid(&ctx.pid_path()) {
            Some(pid) if process_alive(pid) => pid,
            _ => {
                formatter.info("daemon is not running");
                if ctx.json() {
                    formatter.print_json(&serde_json::json!({
                        "action": "stop",
                        "running": false,
                    }));
                }
                return Ok(());
            }
        };

        info!(pid, "Sending SIGTERM to daemon");
        send_signal(pid, Signal::Term)?;

        if wait_for_exit(pid, SHUTDOWN_GRACE).await {
            formatter.success(&format!("daemon stopped (pid {pid})"));
        } else {
            warn!(pid, "Daemon ignored SIGTERM; escalating to SIGKILL");
            send_signal(pid, Signal::Kill)?;
            if !wait_for_exit(pid, Duration::from_secs(1)).await {
                bail!("process {pid} survived SIGKILL");
            }
            formatter.success(&format!("daemon killed after timeout (pid {pid})"));
        }

        if ctx.json() {
            formatter.print_json(&serde_json::json!({
                "action": "stop",
                "pid": pid,
                "running": false,
            }));
        }
        Ok(())
    }
}

async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    !process_alive(pid)
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    let signo = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    let result = unsafe { libc::kill(pid as libc::pid_t, signo) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        // Already gone is fine
        if err.raw_os_error() != Some(libc::ESRCH) {
            bail!("failed to signal process {pid}: {err}");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn send_signal(pid: u32, _signal: Signal) -> Result<()> {
    bail!("stopping by PID is not supported on this platform (pid {pid})")
}
