//! Thread-safe signature cache
//!
//! Maps watched paths to their last observed [`FileSignature`]. Readers
//! share the lock; writers are exclusive. The event consumer and the safety
//! scan both mutate the cache concurrently, so the create/modify/unchanged
//! decision happens inside [`SignatureCache::upsert`] under a single write
//! lock rather than as an external compare-then-set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::domain::FileSignature;

/// Outcome of an [`SignatureCache::upsert`], decided inside the write lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureUpdate {
    /// No prior signature existed for the path
    Created,
    /// A prior signature existed and differed; carries the replaced one
    Modified(FileSignature),
    /// The prior signature is equal; nothing was written
    Unchanged,
}

/// In-memory path → signature map shared between monitor tasks
#[derive(Debug, Default)]
pub struct SignatureCache {
    entries: RwLock<HashMap<PathBuf, FileSignature>>,
}

impl SignatureCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the signature for `path`, if cached.
    pub fn get(&self, path: &Path) -> Option<FileSignature> {
        self.entries.read().expect("cache lock poisoned").get(path).cloned()
    }

    /// Stores `sig` for `path`, replacing any previous entry.
    pub fn set(&self, path: PathBuf, sig: FileSignature) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(path, sig);
    }

    /// Inserts or replaces the signature for `path` and reports what the
    /// write meant, all within one critical section.
    pub fn upsert(&self, path: &Path, sig: FileSignature) -> SignatureUpdate {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        match entries.get(path) {
            None => {
                entries.insert(path.to_path_buf(), sig);
                SignatureUpdate::Created
            }
            Some(prev) if *prev == sig => SignatureUpdate::Unchanged,
            Some(prev) => {
                let old = prev.clone();
                entries.insert(path.to_path_buf(), sig);
                SignatureUpdate::Modified(old)
            }
        }
    }

    /// Removes the entry for `path`. Returns the removed signature so the
    /// caller can report the old size.
    pub fn delete(&self, path: &Path) -> Option<FileSignature> {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(path)
    }

    /// Returns a deep copy of every entry.
    pub fn snapshot(&self) -> HashMap<PathBuf, FileSignature> {
        self.entries.read().expect("cache lock poisoned").clone()
    }

    /// Replaces the entire cache contents.
    pub fn replace_all(&self, entries: HashMap<PathBuf, FileSignature>) {
        *self.entries.write().expect("cache lock poisoned") = entries;
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a deep copy of the entries rooted at `dir`: the path itself
    /// or anything under `dir` + separator.
    pub fn files_under(&self, dir: &Path) -> HashMap<PathBuf, FileSignature> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .iter()
            .filter(|(path, _)| path.as_path() == dir || path.starts_with(dir))
            .map(|(path, sig)| (path.clone(), sig.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sig(size: u64) -> FileSignature {
        FileSignature {
            size,
            mtime: Utc::now(),
            hash: None,
        }
    }

    #[test]
    fn test_get_after_set() {
        let cache = SignatureCache::new();
        let s = sig(5);
        cache.set(PathBuf::from("/d/a.txt"), s.clone());

        assert_eq!(cache.get(Path::new("/d/a.txt")), Some(s));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_after_delete() {
        let cache = SignatureCache::new();
        cache.set(PathBuf::from("/d/a.txt"), sig(5));

        let removed = cache.delete(Path::new("/d/a.txt"));
        assert!(removed.is_some());
        assert_eq!(cache.get(Path::new("/d/a.txt")), None);
    }

    #[test]
    fn test_delete_missing_returns_none() {
        let cache = SignatureCache::new();
        assert!(cache.delete(Path::new("/nope")).is_none());
    }

    #[test]
    fn test_upsert_decisions() {
        let cache = SignatureCache::new();
        let path = Path::new("/d/a.txt");

        assert_eq!(cache.upsert(path, sig(5)), SignatureUpdate::Created);

        let current = cache.get(path).unwrap();
        assert_eq!(
            cache.upsert(path, current.clone()),
            SignatureUpdate::Unchanged
        );

        match cache.upsert(path, sig(11)) {
            SignatureUpdate::Modified(old) => assert_eq!(old.size, 5),
            other => panic!("expected Modified, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_is_a_deep_copy() {
        let cache = SignatureCache::new();
        cache.set(PathBuf::from("/d/a.txt"), sig(1));

        let mut snap = cache.snapshot();
        snap.insert(PathBuf::from("/d/b.txt"), sig(2));

        // Mutating the snapshot must not leak into the cache
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replace_all() {
        let cache = SignatureCache::new();
        cache.set(PathBuf::from("/old"), sig(1));

        let mut next = HashMap::new();
        next.insert(PathBuf::from("/new/a"), sig(2));
        next.insert(PathBuf::from("/new/b"), sig(3));
        cache.replace_all(next);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(Path::new("/old")).is_none());
    }

    #[test]
    fn test_files_under_filters_by_prefix() {
        let cache = SignatureCache::new();
        cache.set(PathBuf::from("/watch/a/x.txt"), sig(1));
        cache.set(PathBuf::from("/watch/a/sub/y.txt"), sig(2));
        cache.set(PathBuf::from("/watch/ab/z.txt"), sig(3));
        cache.set(PathBuf::from("/other/w.txt"), sig(4));

        let under = cache.files_under(Path::new("/watch/a"));
        assert_eq!(under.len(), 2);
        assert!(under.contains_key(Path::new("/watch/a/x.txt")));
        assert!(under.contains_key(Path::new("/watch/a/sub/y.txt")));
        // "/watch/ab" shares the string prefix but is a different directory
        assert!(!under.contains_key(Path::new("/watch/ab/z.txt")));
    }
}
