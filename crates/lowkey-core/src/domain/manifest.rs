//! The watch manifest - persisted desired state
//!
//! A [`Manifest`] names the directories the daemon should watch plus the
//! optional log and ignore-file locations. Directories are kept absolute,
//! cleaned, unique, and sorted so that on-disk round trips are
//! bit-for-bit stable and set diffs are cheap.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::WatchError;

/// Persisted description of what the monitor should watch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Watched directory roots: absolute, cleaned, unique, sorted
    pub directories: Vec<PathBuf>,
    /// Log file override; the daemon picks a state-dir default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    /// Ignore-pattern file (one glob per line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_file: Option<PathBuf>,
}

impl Manifest {
    /// Creates a manifest from raw directory paths, normalizing as it goes.
    pub fn new(directories: Vec<PathBuf>) -> Self {
        let mut manifest = Self {
            directories,
            log_path: None,
            ignore_file: None,
        };
        manifest.normalize();
        manifest
    }

    /// Cleans, deduplicates, and sorts the directory set, and drops empty
    /// optional paths left behind by older manifest files.
    pub fn normalize(&mut self) {
        let unique: BTreeSet<PathBuf> = self
            .directories
            .iter()
            .map(|p| clean_path(p))
            .collect();
        self.directories = unique.into_iter().collect();

        if matches!(&self.log_path, Some(p) if p.as_os_str().is_empty()) {
            self.log_path = None;
        }
        if matches!(&self.ignore_file, Some(p) if p.as_os_str().is_empty()) {
            self.ignore_file = None;
        }
    }

    /// Validates the invariants a running daemon relies on.
    ///
    /// # Errors
    /// Returns [`WatchError::ConfigInvalid`] when the directory set is empty
    /// or contains a relative path.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.directories.is_empty() {
            return Err(WatchError::ConfigInvalid(
                "manifest has no directories".to_string(),
            ));
        }
        for dir in &self.directories {
            if !dir.is_absolute() {
                return Err(WatchError::ConfigInvalid(format!(
                    "directory is not absolute: {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Computes the set difference against another (desired) manifest.
    pub fn diff(&self, desired: &Manifest) -> ManifestDiff {
        let current: BTreeSet<&PathBuf> = self.directories.iter().collect();
        let wanted: BTreeSet<&PathBuf> = desired.directories.iter().collect();

        ManifestDiff {
            added: wanted.difference(&current).map(|p| (*p).clone()).collect(),
            removed: current.difference(&wanted).map(|p| (*p).clone()).collect(),
        }
    }
}

/// Difference between a running manifest and the desired one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDiff {
    /// Directories to start watching, sorted
    pub added: Vec<PathBuf>,
    /// Directories to stop watching, sorted
    pub removed: Vec<PathBuf>,
}

impl ManifestDiff {
    /// True when the manifests describe the same directory set.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Removes `.` segments and resolves `..` lexically, without touching the
/// filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    cleaned.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_strips_dot_segments() {
        assert_eq!(clean_path(Path::new("/a/./b")), PathBuf::from("/a/b"));
        assert_eq!(clean_path(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_normalize_sorts_and_dedupes() {
        let manifest = Manifest::new(vec![
            PathBuf::from("/b"),
            PathBuf::from("/a/x/.."),
            PathBuf::from("/a"),
            PathBuf::from("/b/."),
        ]);

        assert_eq!(
            manifest.directories,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_validate_rejects_empty_set() {
        let manifest = Manifest::default();
        assert!(matches!(
            manifest.validate(),
            Err(WatchError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        let manifest = Manifest::new(vec![PathBuf::from("relative/dir")]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_absolute_dirs() {
        let manifest = Manifest::new(vec![PathBuf::from("/watch/a")]);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_diff_reports_added_and_removed() {
        let running = Manifest::new(vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        let desired = Manifest::new(vec![PathBuf::from("/a"), PathBuf::from("/c")]);

        let diff = running.diff(&desired);
        assert_eq!(diff.added, vec![PathBuf::from("/c")]);
        assert_eq!(diff.removed, vec![PathBuf::from("/b")]);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_diff_of_identical_manifests_is_empty() {
        let a = Manifest::new(vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        let b = a.clone();
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let mut manifest = Manifest::new(vec![PathBuf::from("/abs/a"), PathBuf::from("/abs/b")]);
        manifest.log_path = Some(PathBuf::from("/opt/log/lowkey.log"));

        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest, back);
    }

    #[test]
    fn test_empty_optional_paths_become_none() {
        let json = r#"{ "directories": ["/abs/a"], "log_path": "", "ignore_file": "" }"#;
        let mut manifest: Manifest = serde_json::from_str(json).unwrap();
        manifest.normalize();
        assert!(manifest.log_path.is_none());
        assert!(manifest.ignore_file.is_none());
    }
}
