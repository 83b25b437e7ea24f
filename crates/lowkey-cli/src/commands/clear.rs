//! Remove the persisted manifest

use anyhow::Result;
use clap::Args;

use lowkey_store::{process_alive, read_pid};

use crate::context::CliContext;

/// Remove the persisted manifest
#[derive(Debug, Args)]
pub struct ClearCommand {}

impl ClearCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        if let Some(pid) = read_pid(&ctx.pid_path()) {
            if process_alive(pid) {
                formatter.warn(&format!(
                    "daemon is still running (pid {pid}); it keeps its current directories until restarted"
                ));
            }
        }

        ctx.store().clear()?;
        formatter.success("manifest cleared");
        if ctx.json() {
            formatter.print_json(&serde_json::json!({
                "action": "clear",
                "manifest_path": ctx.store().path(),
            }));
        }
        Ok(())
    }
}
