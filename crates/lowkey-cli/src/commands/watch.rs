//! Foreground watch command
//!
//! Runs a watcher controller in-process and prints every change to stdout
//! until interrupted. Useful for trying out patterns before committing a
//! directory set to the daemon.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use lowkey_core::domain::{Change, Manifest};
use lowkey_core::ignore::IgnoreSet;
use lowkey_core::logline;
use lowkey_watch::controller::{ControllerConfig, WatcherController};
use lowkey_watch::monitor::ChangeSubscriber;

use crate::context::CliContext;

/// Watch directories in the foreground
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Directories to watch; defaults to the persisted manifest
    #[arg(value_name = "DIR")]
    directories: Vec<PathBuf>,

    /// Ignore-pattern file (one glob per line)
    #[arg(long, value_name = "PATH")]
    ignore_file: Option<PathBuf>,

    /// Safety-scan interval in seconds
    #[arg(long, default_value_t = 30)]
    scan_interval: u64,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let directories = if self.directories.is_empty() {
            ctx.require_manifest()?.directories
        } else {
            let manifest = Manifest::new(
                self.directories
                    .iter()
                    .map(|d| absolutize(d))
                    .collect::<Result<Vec<_>>>()?,
            );
            manifest.validate()?;
            manifest.directories
        };

        let ignore = match &self.ignore_file {
            Some(path) => IgnoreSet::from_file(path)?,
            None => IgnoreSet::empty(),
        };

        let formatter = ctx.formatter();
        formatter.info(&format!(
            "watching {} director{} (ctrl-c to stop)",
            directories.len(),
            if directories.len() == 1 { "y" } else { "ies" }
        ));

        let json = ctx.json();
        let roots = directories.clone();
        let printer: ChangeSubscriber = Arc::new(move |change: &Change| {
            if json {
                if let Ok(line) = serde_json::to_string(change) {
                    println!("{line}");
                }
            } else {
                println!("{}", logline::format_line(change, &roots));
            }
        });

        let mut config = ControllerConfig::new(directories);
        config.ignore = ignore;
        config.scan_interval = std::time::Duration::from_secs(self.scan_interval.max(1));

        let mut controller = WatcherController::new(config)?.with_subscriber(printer);
        controller.start()?;

        tokio::signal::ctrl_c().await?;
        info!("Interrupted; stopping watcher");
        controller.stop().await;
        Ok(())
    }
}

fn absolutize(path: &std::path::Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let joined = std::env::current_dir()?.join(path);
    if !joined.is_dir() {
        bail!("not a directory: {}", path.display());
    }
    Ok(joined)
}
