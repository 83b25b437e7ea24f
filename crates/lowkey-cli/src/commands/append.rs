//! Append JSON lines from stdin through the rotating log
//!
//! One JSON object per input line; lines that fail to parse are skipped
//! with a warning on stderr. Valid lines pass through the same rotating
//! writer the daemon uses, so size limits and retention apply.

use std::io::BufRead;

use anyhow::Result;
use clap::Args;

use lowkey_store::RotatingLog;

use crate::context::CliContext;

/// Append JSON lines from stdin through the rotating log
#[derive(Debug, Args)]
pub struct AppendCommand {}

impl AppendCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let log = RotatingLog::open_default(ctx.log_path())?;

        let stdin = std::io::stdin();
        let mut appended = 0u64;
        let mut skipped = 0u64;

        for (number, line) in stdin.lock().lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if log.append_json_line(&line)? {
                appended += 1;
            } else {
                skipped += 1;
                formatter.warn(&format!("skipping invalid JSON on line {}", number + 1));
            }
        }

        formatter.success(&format!(
            "appended {appended} line{}{}",
            if appended == 1 { "" } else { "s" },
            if skipped > 0 {
                format!(", skipped {skipped}")
            } else {
                String::new()
            }
        ));
        if ctx.json() {
            formatter.print_json(&serde_json::json!({
                "action": "append",
                "appended": appended,
                "skipped": skipped,
                "log_path": log.path(),
            }));
        }
        Ok(())
    }
}
