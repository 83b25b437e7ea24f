//! Start the background daemon
//!
//! Persists the manifest, then spawns `lowkeyd` detached with the
//! environment contract set. When a live daemon already owns the PID file
//! the new manifest is saved and the daemon is signalled to reconcile
//! instead of spawning a second process.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use lowkey_core::domain::Manifest;
use lowkey_daemon::env;
use lowkey_store::{process_alive, read_pid};

use crate::context::CliContext;

/// Start the background daemon
#[derive(Debug, Args)]
pub struct StartCommand {
    /// Directories to watch; defaults to the persisted manifest
    #[arg(value_name = "DIR")]
    directories: Vec<PathBuf>,

    /// Log file location override
    #[arg(long, value_name = "PATH")]
    log_path: Option<PathBuf>,

    /// Ignore-pattern file (one glob per line)
    #[arg(long, value_name = "PATH")]
    ignore_file: Option<PathBuf>,

    /// Metrics bind address, e.g. 127.0.0.1:9600
    #[arg(long, value_name = "ADDR")]
    metrics_addr: Option<String>,
}

impl StartCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let manifest = self.resolve_manifest(ctx)?;
        manifest.validate()?;

        // A live daemon picks the new manifest up via SIGHUP reconcile
        if let Some(pid) = read_pid(&ctx.pid_path()) {
            if process_alive(pid) {
                return self.reconfigure_running(ctx, pid, &manifest);
            }
        }

        ctx.store().save(&manifest)?;

        let daemon_bin = find_daemon_binary()?;
        let mut command = Command::new(&daemon_bin);
        command
            .env(env::DAEMON_FLAG, "1")
            .env(env::MANIFEST_VAR, ctx.store().path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(addr) = &self.metrics_addr {
            command.env(env::METRICS_ADDR_VAR, addr);
        }

        let child = command
            .spawn()
            .with_context(|| format!("failed to spawn {}", daemon_bin.display()))?;
        info!(pid = child.id(), "Spawned daemon child");

        let formatter = ctx.formatter();
        formatter.success(&format!(
            "daemon started (pid {}), watching {} director{}",
            child.id(),
            manifest.directories.len(),
            if manifest.directories.len() == 1 { "y" } else { "ies" }
        ));
        if ctx.json() {
            formatter.print_json(&serde_json::json!({
                "action": "start",
                "pid": child.id(),
                "directories": manifest.directories,
                "manifest_path": ctx.store().path(),
            }));
        }
        Ok(())
    }

    /// Persists the new manifest and signals the running daemon to
    /// reconcile.
    #[cfg(unix)]
    fn reconfigure_running(&self, ctx: &CliContext, pid: u32, manifest: &Manifest) -> Result<()> {
        ctx.store().save(manifest)?;

        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGHUP) };
        if result != 0 {
            bail!(
                "failed to signal running daemon (pid {pid}): {}",
                std::io::Error::last_os_error()
            );
        }

        let formatter = ctx.formatter();
        formatter.success(&format!(
            "daemon already running (pid {pid}); manifest updated, reconcile requested"
        ));
        if ctx.json() {
            formatter.print_json(&serde_json::json!({
                "action": "reconcile",
                "pid": pid,
                "directories": manifest.directories,
            }));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn reconfigure_running(&self, _ctx: &CliContext, pid: u32, _manifest: &Manifest) -> Result<()> {
        bail!("already running (pid {pid})");
    }

    fn resolve_manifest(&self, ctx: &CliContext) -> Result<Manifest> {
        if self.directories.is_empty() {
            let mut manifest = ctx.require_manifest()?;
            if self.log_path.is_some() {
                manifest.log_path = self.log_path.clone();
            }
            if self.ignore_file.is_some() {
                manifest.ignore_file = self.ignore_file.clone();
            }
            return Ok(manifest);
        }

        let cwd = std::env::current_dir()?;
        let mut manifest = Manifest::new(
            self.directories
                .iter()
                .map(|d| {
                    if d.is_absolute() {
                        d.clone()
                    } else {
                        cwd.join(d)
                    }
                })
                .collect(),
        );
        manifest.log_path = self.log_path.clone();
        manifest.ignore_file = self.ignore_file.clone();
        Ok(manifest)
    }
}

/// Locates `lowkeyd` next to the current executable, falling back to PATH.
fn find_daemon_binary() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot resolve current executable")?;
    if let Some(dir) = exe.parent() {
        let sibling = dir.join(daemon_name());
        if sibling.is_file() {
            return Ok(sibling);
        }
    }
    Ok(PathBuf::from(daemon_name()))
}

#[cfg(windows)]
fn daemon_name() -> &'static str {
    "lowkeyd.exe"
}

#[cfg(not(windows))]
fn daemon_name() -> &'static str {
    "lowkeyd"
}
