//! Shared command context
//!
//! Resolves the manifest store (honoring `--config`) and carries the
//! output format into every command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use lowkey_core::domain::Manifest;
use lowkey_core::paths;
use lowkey_store::ManifestStore;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Everything a command needs besides its own arguments
pub struct CliContext {
    store: ManifestStore,
    format: OutputFormat,
}

impl CliContext {
    /// Builds the context. A `--config` path overrides the state directory
    /// (the manifest's parent directory becomes the state dir).
    pub fn new(config: Option<PathBuf>, format: OutputFormat) -> Self {
        let store = match config {
            Some(path) => {
                let state_dir = path
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(paths::state_dir);
                ManifestStore::new(state_dir)
            }
            None => ManifestStore::default_location(),
        };
        Self { store, format }
    }

    /// The manifest store.
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// The selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// A formatter for the selected output format.
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// True when JSON output was requested.
    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Loads the persisted manifest, failing when none exists.
    pub fn require_manifest(&self) -> Result<Manifest> {
        self.store
            .load()?
            .context("no manifest found; run `lowkey start <dir>...` first")
    }

    /// Resolves the active log path from the manifest (or the default).
    pub fn log_path(&self) -> PathBuf {
        let from_manifest = self
            .store
            .load()
            .ok()
            .flatten()
            .and_then(|manifest| manifest.log_path);
        from_manifest.unwrap_or_else(|| self.store.state_dir().join(paths::LOG_FILE))
    }

    /// Path of the daemon PID file.
    pub fn pid_path(&self) -> PathBuf {
        self.store.state_dir().join(paths::PID_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_override_moves_the_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("daemon.json");

        let ctx = CliContext::new(Some(manifest.clone()), OutputFormat::Plain);
        assert_eq!(ctx.store().path(), manifest);
        assert_eq!(ctx.pid_path(), dir.path().join("daemon.pid"));
    }

    #[test]
    fn test_log_path_prefers_manifest_setting() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext::new(
            Some(dir.path().join("daemon.json")),
            OutputFormat::Plain,
        );

        // Without a manifest the default under the state dir is used
        assert_eq!(ctx.log_path(), dir.path().join("lowkey.log"));

        let mut manifest = Manifest::new(vec![dir.path().to_path_buf()]);
        manifest.log_path = Some(PathBuf::from("/opt/log/lowkey.log"));
        ctx.store().save(&manifest).unwrap();

        assert_eq!(ctx.log_path(), PathBuf::from("/opt/log/lowkey.log"));
    }

    #[test]
    fn test_require_manifest_fails_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext::new(
            Some(dir.path().join("daemon.json")),
            OutputFormat::Json,
        );
        assert!(ctx.require_manifest().is_err());
        assert!(ctx.json());
    }
}
