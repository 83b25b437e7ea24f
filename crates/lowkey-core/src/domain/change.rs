//! Change records emitted by the monitor
//!
//! A [`Change`] is the externally visible unit of work: one detected
//! creation, modification, or deletion, stamped in UTC. The [`Summary`]
//! snapshot is what the aggregator hands back for status reporting.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of filesystem change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A file appeared that was not in the cache
    Create,
    /// A cached file's signature no longer matches
    Modify,
    /// A cached file is gone
    Delete,
    /// Synthetic record emitted when a controller starts
    Boot,
    /// Backend-provided kind forwarded verbatim
    Other(String),
}

impl ChangeKind {
    /// Log label for this kind: NEW, MODIFIED, DELETED, BOOT, or the raw
    /// backend string.
    pub fn label(&self) -> &str {
        match self {
            ChangeKind::Create => "NEW",
            ChangeKind::Modify => "MODIFIED",
            ChangeKind::Delete => "DELETED",
            ChangeKind::Boot => "BOOT",
            ChangeKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One detected filesystem change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Absolute path the change applies to
    pub path: PathBuf,
    /// What happened
    pub kind: ChangeKind,
    /// When the change was observed, UTC
    pub timestamp: DateTime<Utc>,
    /// Current size, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Previous size, when the change replaced a cached signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_size: Option<u64>,
    /// Size delta (`size - old_size`), when both sides are known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_delta: Option<i64>,
}

impl Change {
    /// Creates a change with the given kind and path, stamped now.
    pub fn new(path: PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Utc::now(),
            size: None,
            old_size: None,
            size_delta: None,
        }
    }

    /// Attaches the observed size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Attaches the previous size and derives the delta when possible.
    pub fn with_old_size(mut self, old_size: u64) -> Self {
        self.old_size = Some(old_size);
        if let Some(size) = self.size {
            self.size_delta = Some(size as i64 - old_size as i64);
        }
        self
    }

    /// Overrides the observation timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Aggregator snapshot exposed through status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Total changes recorded since the aggregator was created
    pub count: u64,
    /// Changes recorded within the requested window
    pub recent: u64,
    /// The most recent change, if any
    pub last_change: Option<Change>,
    /// Change counts bucketed by the parent directory of each path
    pub per_directory: BTreeMap<PathBuf, u64>,
}
