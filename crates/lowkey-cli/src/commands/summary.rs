//! Summarize recent changes from the log

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use lowkey_core::logline;

use crate::context::CliContext;

/// Summarize recent changes from the log
#[derive(Debug, Args)]
pub struct SummaryCommand {
    /// Window in seconds to summarize over
    #[arg(long, default_value_t = 300)]
    window: u64,
}

impl SummaryCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let path = ctx.log_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read log file {}", path.display()))?;

        let horizon = Utc::now() - chrono::Duration::seconds(self.window as i64);
        let mut by_label: BTreeMap<String, u64> = BTreeMap::new();
        let mut total = 0u64;
        let mut last = None;

        for line in content.lines() {
            let record = match logline::parse_line(line) {
                Some(record) => record,
                None => continue,
            };
            if record.timestamp < horizon {
                continue;
            }
            *by_label.entry(record.label.clone()).or_insert(0) += 1;
            total += 1;
            last = Some(record);
        }

        if ctx.json() {
            ctx.formatter().print_json(&serde_json::json!({
                "window_seconds": self.window,
                "total": total,
                "by_type": by_label,
                "last": last.map(|r| serde_json::json!({
                    "timestamp": r.timestamp.to_rfc3339(),
                    "type": r.label,
                    "detail": r.detail,
                })),
            }));
            return Ok(());
        }

        let formatter = ctx.formatter();
        formatter.info(&format!(
            "{} change{} in the last {}s",
            total,
            if total == 1 { "" } else { "s" },
            self.window
        ));
        for (label, count) in &by_label {
            formatter.info(&format!("  {label:<9} {count}"));
        }
        if let Some(record) = last {
            formatter.info(&format!(
                "last: [{}] {}",
                record.label, record.detail
            ));
        }
        Ok(())
    }
}
