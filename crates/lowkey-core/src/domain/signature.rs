//! File signatures - compact change-detection fingerprints
//!
//! A [`FileSignature`] captures enough metadata (size, mtime, and for small
//! files a content digest) to decide whether a path changed without doing a
//! full content comparison on every scan.

use std::fs::Metadata;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::WatchError;

/// Files at or below this size (and non-empty) get a SHA-256 content digest
/// in addition to size and mtime.
pub const SMALL_FILE_THRESHOLD: u64 = 64 * 1024;

/// Compact fingerprint of a regular file used to detect changes
///
/// Equality is component-wise; `mtime` compares as an instant. Signatures
/// are only ever computed for non-directory entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSignature {
    /// File size in bytes
    pub size: u64,
    /// Last modification time in UTC
    pub mtime: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the content, present only when
    /// `0 < size <= SMALL_FILE_THRESHOLD`
    pub hash: Option<String>,
}

/// Computes the signature for a regular file
///
/// # Arguments
/// * `path` - The file path, used for reading small-file content
/// * `meta` - Metadata already obtained for the path
///
/// # Errors
/// Returns [`WatchError::NotADirectory`]'s counterpart failure when `meta`
/// denotes a directory, and [`WatchError::PathIo`] when the mtime or the
/// small-file content cannot be read.
pub fn compute_signature(path: &Path, meta: &Metadata) -> Result<FileSignature, WatchError> {
    if meta.is_dir() {
        return Err(WatchError::path_io(
            path,
            "cannot compute signature for a directory",
        ));
    }

    let size = meta.len();
    let mtime = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| WatchError::path_io(path, e))?;

    let hash = if size > 0 && size <= SMALL_FILE_THRESHOLD {
        Some(hash_small_file(path)?)
    } else {
        None
    };

    Ok(FileSignature { size, mtime, hash })
}

/// Compares a freshly computed signature against the cached one
///
/// Returns the new signature together with `true` when no prior signature
/// exists or the comparison fails, `false` when they are equal.
pub fn detect_change(
    cached: Option<&FileSignature>,
    path: &Path,
    meta: &Metadata,
) -> Result<(FileSignature, bool), WatchError> {
    let current = compute_signature(path, meta)?;
    let changed = match cached {
        Some(prev) => *prev != current,
        None => true,
    };
    Ok((current, changed))
}

/// Reads up to [`SMALL_FILE_THRESHOLD`] bytes and returns the lowercase hex
/// SHA-256 digest.
fn hash_small_file(path: &Path) -> Result<String, WatchError> {
    let file = std::fs::File::open(path).map_err(|e| WatchError::path_io(path, e))?;
    let mut buf = Vec::with_capacity(SMALL_FILE_THRESHOLD as usize);
    file.take(SMALL_FILE_THRESHOLD)
        .read_to_end(&mut buf)
        .map_err(|e| WatchError::path_io(path, e))?;

    let digest = Sha256::digest(&buf);
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_signature_for_small_file_has_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.txt");
        fs::write(&path, b"hello").unwrap();

        let meta = fs::metadata(&path).unwrap();
        let sig = compute_signature(&path, &meta).unwrap();

        assert_eq!(sig.size, 5);
        let hash = sig.hash.expect("small file should be hashed");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash.to_lowercase());
    }

    #[test]
    fn test_signature_for_empty_file_has_no_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").unwrap();

        let meta = fs::metadata(&path).unwrap();
        let sig = compute_signature(&path, &meta).unwrap();

        assert_eq!(sig.size, 0);
        assert!(sig.hash.is_none());
    }

    #[test]
    fn test_signature_for_large_file_has_no_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.bin");
        fs::write(&path, vec![7u8; (SMALL_FILE_THRESHOLD + 1) as usize]).unwrap();

        let meta = fs::metadata(&path).unwrap();
        let sig = compute_signature(&path, &meta).unwrap();

        assert_eq!(sig.size, SMALL_FILE_THRESHOLD + 1);
        assert!(sig.hash.is_none());
    }

    #[test]
    fn test_signature_at_threshold_boundary_has_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.bin");
        fs::write(&path, vec![1u8; SMALL_FILE_THRESHOLD as usize]).unwrap();

        let meta = fs::metadata(&path).unwrap();
        let sig = compute_signature(&path, &meta).unwrap();

        assert!(sig.hash.is_some());
    }

    #[test]
    fn test_signature_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let meta = fs::metadata(dir.path()).unwrap();

        let result = compute_signature(dir.path(), &meta);
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_change_without_cached_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"one").unwrap();

        let meta = fs::metadata(&path).unwrap();
        let (_, changed) = detect_change(None, &path, &meta).unwrap();
        assert!(changed);
    }

    #[test]
    fn test_detect_change_with_equal_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"one").unwrap();

        let meta = fs::metadata(&path).unwrap();
        let (sig, _) = detect_change(None, &path, &meta).unwrap();
        let (_, changed) = detect_change(Some(&sig), &path, &meta).unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_detect_change_after_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"one").unwrap();

        let meta = fs::metadata(&path).unwrap();
        let (sig, _) = detect_change(None, &path, &meta).unwrap();

        fs::write(&path, b"two plus more").unwrap();
        let meta = fs::metadata(&path).unwrap();
        let (new_sig, changed) = detect_change(Some(&sig), &path, &meta).unwrap();

        assert!(changed);
        assert_eq!(new_sig.size, 13);
    }
}
