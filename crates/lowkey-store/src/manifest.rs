//! Atomic manifest persistence
//!
//! One `daemon.json` per state directory. Saves go through a sibling temp
//! file that is renamed over the target, so readers never observe a
//! half-written manifest. Single-writer use; concurrent writers are out of
//! scope.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use lowkey_core::domain::{Manifest, WatchError};
use lowkey_core::paths;

/// Store for the persisted watch manifest
#[derive(Debug, Clone)]
pub struct ManifestStore {
    state_dir: PathBuf,
}

impl ManifestStore {
    /// Creates a store rooted at `state_dir`.
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Creates a store rooted at the platform state directory.
    pub fn default_location() -> Self {
        Self::new(paths::state_dir())
    }

    /// Canonical path of the manifest file.
    pub fn path(&self) -> PathBuf {
        self.state_dir.join(paths::MANIFEST_FILE)
    }

    /// Persists `manifest` atomically (temp file + rename).
    ///
    /// The manifest is normalized before encoding so repeated saves are
    /// idempotent on disk.
    ///
    /// # Errors
    /// Returns [`WatchError::ManifestPersist`] on any I/O or encoding
    /// failure.
    pub fn save(&self, manifest: &Manifest) -> Result<(), WatchError> {
        std::fs::create_dir_all(&self.state_dir)
            .map_err(|e| WatchError::ManifestPersist(e.to_string()))?;

        let mut normalized = manifest.clone();
        normalized.normalize();

        let json = serde_json::to_string_pretty(&normalized)
            .map_err(|e| WatchError::ManifestPersist(e.to_string()))?;

        let mut temp = tempfile::Builder::new()
            .prefix("manifest-")
            .suffix(".json")
            .tempfile_in(&self.state_dir)
            .map_err(|e| WatchError::ManifestPersist(e.to_string()))?;
        temp.write_all(json.as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| WatchError::ManifestPersist(e.to_string()))?;

        temp.persist(self.path())
            .map_err(|e| WatchError::ManifestPersist(e.to_string()))?;

        info!(
            path = %self.path().display(),
            directories = normalized.directories.len(),
            "Manifest saved"
        );
        Ok(())
    }

    /// Loads the manifest, or `None` when the file does not exist.
    ///
    /// # Errors
    /// Returns [`WatchError::ManifestDecode`] when the file exists but is
    /// not a valid manifest, and [`WatchError::PathIo`] on read failures.
    pub fn load(&self) -> Result<Option<Manifest>, WatchError> {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No manifest on disk");
                return Ok(None);
            }
            Err(e) => return Err(WatchError::path_io(&path, e)),
        };

        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|e| WatchError::ManifestDecode(e.to_string()))?;
        Ok(Some(manifest))
    }

    /// Removes the manifest file. Absence is not an error.
    pub fn clear(&self) -> Result<(), WatchError> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Manifest cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WatchError::path_io(&path, e)),
        }
    }

    /// The state directory this store writes into.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
}
