//! Size-rotating append-only log writer
//!
//! Records are newline-terminated. A write that would push the file to or
//! past `max_size` triggers rotation first: the active file is renamed to a
//! timestamped backup, a fresh file is opened, and the oldest backups are
//! pruned down to `max_backups`. One mutex covers the size check, the
//! rotation, and the write, so records are never interleaved or split
//! across files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{info, warn};

use lowkey_core::domain::WatchError;

/// Default rotation threshold: 10 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of rotated backups kept.
pub const DEFAULT_MAX_BACKUPS: usize = 5;

struct Inner {
    file: File,
    size: u64,
}

/// Append-only writer with size-triggered rotation
pub struct RotatingLog {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    inner: Mutex<Inner>,
}

impl RotatingLog {
    /// Opens (creating if needed) the log at `path` with the given limits.
    ///
    /// The parent directory is created first; the file is opened for
    /// create + append + write.
    pub fn new(path: PathBuf, max_size: u64, max_backups: usize) -> Result<Self, WatchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WatchError::path_io(&path, e))?;
        }

        let file = Self::open_append(&path)?;
        let size = file
            .metadata()
            .map_err(|e| WatchError::path_io(&path, e))?
            .len();

        Ok(Self {
            path,
            max_size,
            max_backups,
            inner: Mutex::new(Inner { file, size }),
        })
    }

    /// Opens the log with the default 10 MiB / 5 backup limits.
    pub fn open_default(path: PathBuf) -> Result<Self, WatchError> {
        Self::new(path, DEFAULT_MAX_SIZE, DEFAULT_MAX_BACKUPS)
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends raw bytes, rotating first when the write would reach
    /// `max_size`.
    pub fn write(&self, bytes: &[u8]) -> Result<(), WatchError> {
        let mut inner = self.inner.lock().expect("log lock poisoned");

        if inner.size + bytes.len() as u64 >= self.max_size {
            self.rotate(&mut inner)?;
        }

        inner
            .file
            .write_all(bytes)
            .and_then(|_| inner.file.flush())
            .map_err(|e| WatchError::path_io(&self.path, e))?;
        inner.size += bytes.len() as u64;
        Ok(())
    }

    /// Appends a record followed by a newline.
    pub fn write_line(&self, line: &str) -> Result<(), WatchError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.write(&bytes)
    }

    /// Appends one line of the JSON append protocol.
    ///
    /// Returns `Ok(true)` when the line parsed as a JSON object and was
    /// appended, `Ok(false)` when it was skipped as unparseable.
    pub fn append_json_line(&self, line: &str) -> Result<bool, WatchError> {
        if serde_json::from_str::<serde_json::Value>(line).is_err() {
            warn!(line_len = line.len(), "Skipping unparseable JSON line");
            return Ok(false);
        }
        self.write_line(line)?;
        Ok(true)
    }

    /// Closes the active file, archives it under a timestamp suffix,
    /// reopens a fresh file, and prunes old backups.
    fn rotate(&self, inner: &mut Inner) -> Result<(), WatchError> {
        // Nothing to archive when the active file is empty
        if inner.size == 0 {
            return Ok(());
        }

        let backup = self.backup_path();
        std::fs::rename(&self.path, &backup)
            .map_err(|e| WatchError::LogRotate(e.to_string()))?;

        inner.file = Self::open_append(&self.path)?;
        inner.size = 0;

        info!(
            backup = %backup.display(),
            "Rotated log file"
        );

        self.prune_backups()
    }

    /// Picks a backup name `base.YYYYMMDD-HHMMSS`, suffixing a counter when
    /// several rotations land inside one second.
    fn backup_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = self.path.with_file_name(format!("{name}.{stamp}"));
        if !base.exists() {
            return base;
        }
        let mut counter = 1u32;
        loop {
            let candidate = PathBuf::from(format!("{}-{}", base.display(), counter));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Removes the oldest backups (sorted by name ascending; the timestamp
    /// suffixes order lexicographically) until at most `max_backups` remain.
    fn prune_backups(&self) -> Result<(), WatchError> {
        let parent = match self.path.parent() {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let base_name = match self.path.file_name() {
            Some(name) => format!("{}.", name.to_string_lossy()),
            None => return Ok(()),
        };

        let mut backups: Vec<PathBuf> = std::fs::read_dir(parent)
            .map_err(|e| WatchError::LogRotate(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&base_name))
                    .unwrap_or(false)
            })
            .collect();
        backups.sort();

        while backups.len() > self.max_backups {
            let oldest = backups.remove(0);
            if let Err(e) = std::fs::remove_file(&oldest) {
                warn!(path = %oldest.display(), error = %e, "Failed to prune log backup");
            } else {
                info!(path = %oldest.display(), "Pruned log backup");
            }
        }
        Ok(())
    }

    fn open_append(path: &Path) -> Result<File, WatchError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| WatchError::path_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backups_of(dir: &Path, base: &str) -> Vec<PathBuf> {
        let prefix = format!("{base}.");
        let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_write_appends_newline_terminated_records() {
        let dir = tempfile::tempdir().unwrap();
        let log = RotatingLog::new(dir.path().join("lowkey.log"), 1024, 3).unwrap();

        log.write_line("first").unwrap();
        log.write_line("second").unwrap();

        let content = std::fs::read_to_string(dir.path().join("lowkey.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_rotation_keeps_active_file_under_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lowkey.log");
        let log = RotatingLog::new(path.clone(), 64, 2).unwrap();

        // Eight 15-byte records (14 chars + newline)
        for i in 0..8 {
            log.write_line(&format!("record-{i:07}")).unwrap();
        }

        let size = std::fs::metadata(&path).unwrap().len();
        assert!(size <= 64, "active file too large: {size}");
    }

    #[test]
    fn test_rotation_creates_one_backup_at_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lowkey.log");
        let log = RotatingLog::new(path.clone(), 64, 2).unwrap();

        for i in 0..5 {
            log.write_line(&format!("record-{i:07}")).unwrap();
        }

        // Four 15-byte records fill the file to 60 bytes; the 5th write
        // would reach 75 >= 64, so it rotates first and lands alone
        let backups = backups_of(dir.path(), "lowkey.log");
        assert_eq!(backups.len(), 1);
        let active = std::fs::metadata(&path).unwrap().len();
        assert_eq!(active, 15);
    }

    #[test]
    fn test_retention_prunes_oldest_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lowkey.log");
        let log = RotatingLog::new(path, 64, 2).unwrap();

        // Enough records for three rotations
        for i in 0..13 {
            log.write_line(&format!("record-{i:07}")).unwrap();
        }

        let backups = backups_of(dir.path(), "lowkey.log");
        assert_eq!(backups.len(), 2, "retention should cap backups at 2");
    }

    #[test]
    fn test_backup_names_carry_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = RotatingLog::new(dir.path().join("lowkey.log"), 32, 5).unwrap();

        log.write_line("0123456789abcdefghijklmnopqrst").unwrap();
        log.write_line("x").unwrap();

        let backups = backups_of(dir.path(), "lowkey.log");
        assert_eq!(backups.len(), 1);
        let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
        // lowkey.log.YYYYMMDD-HHMMSS
        let stamp = name.strip_prefix("lowkey.log.").unwrap();
        assert!(stamp.len() >= 15);
        assert_eq!(&stamp[8..9], "-");
    }

    #[test]
    fn test_append_json_line_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let log = RotatingLog::open_default(path.clone()).unwrap();

        assert!(log.append_json_line(r#"{"event":"create"}"#).unwrap());
        assert!(!log.append_json_line("not json").unwrap());
        assert!(log.append_json_line(r#"{"event":"delete"}"#).unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("not json"));
    }

    #[test]
    fn test_reopen_preserves_existing_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lowkey.log");

        {
            let log = RotatingLog::new(path.clone(), 1024, 3).unwrap();
            log.write_line("persisted").unwrap();
        }

        // Reopening accounts for the bytes already on disk
        let log = RotatingLog::new(path.clone(), 1024, 3).unwrap();
        log.write_line("more").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "persisted\nmore\n");
    }
}
