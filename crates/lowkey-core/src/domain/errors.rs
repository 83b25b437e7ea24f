//! Domain error types
//!
//! This module defines the error kinds shared across the monitor: fatal
//! startup failures, recoverable per-file failures, and lifecycle errors.

use std::path::Path;

use thiserror::Error;

/// Errors that can occur in watch, store, and daemon operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// Invalid configuration (empty directory set, malformed manifest value)
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A watch target is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Filesystem I/O failure for a specific path
    #[error("I/O error on {path}: {message}")]
    PathIo {
        /// The path the operation failed on
        path: String,
        /// The underlying error description
        message: String,
    },

    /// The on-disk manifest could not be decoded
    #[error("Failed to decode manifest: {0}")]
    ManifestDecode(String),

    /// The manifest could not be persisted
    #[error("Failed to persist manifest: {0}")]
    ManifestPersist(String),

    /// The backend refused to add a watch directory
    #[error("Backend failed to watch {path}: {message}")]
    BackendAddFailed {
        /// The directory that could not be watched
        path: String,
        /// The underlying error description
        message: String,
    },

    /// A transient backend failure; logged and retried, never fatal
    #[error("Transient backend error: {0}")]
    BackendTransient(String),

    /// A live daemon already owns the PID file
    #[error("Daemon already running with PID {0}")]
    PidCollision(u32),

    /// The daemon did not stop within the shutdown grace period
    #[error("Daemon did not stop within {0} seconds")]
    ShutdownTimeout(u64),

    /// Log rotation failure
    #[error("Log rotation failed: {0}")]
    LogRotate(String),
}

impl WatchError {
    /// Builds a [`WatchError::PathIo`] from a path and any displayable error.
    pub fn path_io(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::PathIo {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Builds a [`WatchError::BackendAddFailed`] from a path and cause.
    pub fn backend_add(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::BackendAddFailed {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Builds a [`WatchError::NotADirectory`] for the given path.
    pub fn not_a_directory(path: &Path) -> Self {
        Self::NotADirectory(path.display().to_string())
    }
}
