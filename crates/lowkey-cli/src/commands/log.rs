//! Print recent log lines

use anyhow::{Context, Result};
use clap::Args;

use crate::context::CliContext;

/// Print recent log lines
#[derive(Debug, Args)]
pub struct LogCommand {
    /// How many trailing lines to print
    #[arg(short = 'n', long, default_value_t = 20)]
    lines: usize,
}

impl LogCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let path = ctx.log_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read log file {}", path.display()))?;

        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(self.lines);
        let tail = &all[start..];

        if ctx.json() {
            ctx.formatter().print_json(&serde_json::json!({
                "log_path": path,
                "lines": tail,
            }));
            return Ok(());
        }

        for line in tail {
            println!("{line}");
        }
        Ok(())
    }
}
