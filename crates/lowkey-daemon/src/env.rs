//! Environment contract between the CLI and the daemon child
//!
//! The CLI spawns `lowkeyd` with these variables set; the daemon reads
//! them at startup. Everything has a sensible default so `lowkeyd` can
//! also be run by hand.

use std::path::PathBuf;

/// Presence flag identifying a daemon child process.
pub const DAEMON_FLAG: &str = "LOWKEY_DAEMON";

/// Path of the manifest the daemon should load.
pub const MANIFEST_VAR: &str = "LOWKEY_MANIFEST";

/// Bind address for the optional metrics endpoint, e.g. `127.0.0.1:9600`.
pub const METRICS_ADDR_VAR: &str = "LOWKEY_METRICS_ADDR";

/// Set to `1` to emit a trace span per observed change.
pub const TRACE_VAR: &str = "LOWKEY_TRACE";

/// True when this process was spawned as a daemon child.
pub fn is_daemon_child() -> bool {
    std::env::var_os(DAEMON_FLAG).is_some()
}

/// The manifest path from the environment, if provided.
pub fn manifest_path() -> Option<PathBuf> {
    std::env::var_os(MANIFEST_VAR).map(PathBuf::from)
}

/// The metrics bind address from the environment, if provided.
pub fn metrics_addr() -> Option<String> {
    std::env::var(METRICS_ADDR_VAR).ok().filter(|s| !s.is_empty())
}

/// Whether per-change trace spans are enabled.
pub fn trace_enabled() -> bool {
    std::env::var(TRACE_VAR).map(|v| v == "1").unwrap_or(false)
}
