//! Daemon status
//!
//! There is no IPC surface; status is derived from the PID file liveness
//! probe plus the persisted manifest.

use anyhow::Result;
use clap::Args;

use lowkey_store::{process_alive, read_pid};

use crate::context::CliContext;

/// Show daemon status
#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        let pid = read_pid(&ctx.pid_path());
        let running = pid.map(process_alive).unwrap_or(false);
        let manifest = ctx.store().load()?;

        if ctx.json() {
            formatter.print_json(&serde_json::json!({
                "running": running,
                "pid": pid,
                "manifest_path": ctx.store().path(),
                "directories": manifest
                    .as_ref()
                    .map(|m| m.directories.clone())
                    .unwrap_or_default(),
                "log_path": ctx.log_path(),
            }));
            return Ok(());
        }

        if running {
            formatter.success(&format!("daemon is running (pid {})", pid.unwrap_or(0)));
        } else {
            formatter.info("daemon is not running");
        }
        formatter.info(&format!("manifest: {}", ctx.store().path().display()));
        formatter.info(&format!("log:      {}", ctx.log_path().display()));

        match manifest {
            Some(manifest) => {
                formatter.info(&format!("watching {} directories:", manifest.directories.len()));
                for dir in &manifest.directories {
                    formatter.info(&format!("  {}", dir.display()));
                }
                if let Some(ignore) = &manifest.ignore_file {
                    formatter.info(&format!("ignore file: {}", ignore.display()));
                }
            }
            None => formatter.info("no manifest persisted"),
        }
        Ok(())
    }
}
