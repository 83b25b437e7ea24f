//! Domain entities for the directory monitor
//!
//! This module contains the core value types flowing through lowkey:
//! - File signatures used to detect changes without content comparison
//! - Change records emitted to subscribers and the log
//! - The watch manifest describing desired state
//! - Supervisor heartbeat and aggregator summary snapshots
//! - Domain-specific error types

pub mod change;
pub mod errors;
pub mod heartbeat;
pub mod manifest;
pub mod signature;

// Re-export commonly used types
pub use change::{Change, ChangeKind};
pub use errors::WatchError;
pub use heartbeat::Heartbeat;
pub use manifest::{Manifest, ManifestDiff};
pub use signature::{compute_signature, detect_change, FileSignature, SMALL_FILE_THRESHOLD};

pub use change::Summary;
