//! Follow the log file
//!
//! Prints new lines as the daemon writes them. Rotation shrinks the active
//! file under the reader; when the observed size drops below the read
//! offset the reader reopens from byte zero.

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::context::CliContext;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Follow the log file
#[derive(Debug, Args)]
pub struct TailCommand {
    /// Print this many existing lines before following
    #[arg(short = 'n', long, default_value_t = 10)]
    lines: usize,
}

impl TailCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let path = ctx.log_path();
        let mut file = std::fs::File::open(&path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;

        // Seed with the last N lines, then follow from the end
        let mut existing = String::new();
        file.read_to_string(&mut existing)?;
        let all: Vec<&str> = existing.lines().collect();
        for line in &all[all.len().saturating_sub(self.lines)..] {
            println!("{line}");
        }
        let mut offset = existing.len() as u64;

        let mut carry = String::new();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }

            let size = match std::fs::metadata(&path) {
                Ok(meta) => meta.len(),
                // Mid-rotation; retry on the next poll
                Err(_) => continue,
            };

            if size < offset {
                // Truncated or rotated under us; reopen from the start
                file = std::fs::File::open(&path)
                    .with_context(|| format!("cannot reopen log file {}", path.display()))?;
                offset = 0;
                carry.clear();
            }
            if size == offset {
                continue;
            }

            file.seek(SeekFrom::Start(offset))?;
            let mut chunk = String::new();
            file.read_to_string(&mut chunk)?;
            offset += chunk.len() as u64;

            carry.push_str(&chunk);
            while let Some(newline) = carry.find('\n') {
                let line: String = carry.drain(..=newline).collect();
                print!("{line}");
            }
        }
        Ok(())
    }
}
