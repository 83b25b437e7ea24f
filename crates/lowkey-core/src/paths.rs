//! State directory resolution
//!
//! All persistent daemon state (manifest, PID file, default log) lives in
//! one per-user directory. `XDG_STATE_HOME` always wins; otherwise the
//! location is platform-dependent.

use std::path::PathBuf;

/// Application directory name under the platform state root.
const APP_DIR: &str = "lowkey";

/// File name of the persisted manifest.
pub const MANIFEST_FILE: &str = "daemon.json";

/// File name of the daemon PID file.
pub const PID_FILE: &str = "daemon.pid";

/// Default log file name.
pub const LOG_FILE: &str = "lowkey.log";

/// Resolves the lowkey state directory.
///
/// Honors an `XDG_STATE_HOME` override on every platform. Without it:
/// `~/Library/Application Support/lowkey` on macOS, `%LOCALAPPDATA%/lowkey`
/// on Windows, `~/.local/state/lowkey` elsewhere.
pub fn state_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_STATE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join(APP_DIR);
        }
    }
    platform_state_root().join(APP_DIR)
}

#[cfg(target_os = "macos")]
fn platform_state_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join("Library")
        .join("Application Support")
}

#[cfg(target_os = "windows")]
fn platform_state_root() -> PathBuf {
    std::env::var_os("LOCALAPPDATA")
        .map(PathBuf::from)
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_state_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".local")
        .join("state")
}

/// Default manifest path under the state directory.
pub fn manifest_path() -> PathBuf {
    state_dir().join(MANIFEST_FILE)
}

/// Default PID file path under the state directory.
pub fn pid_path() -> PathBuf {
    state_dir().join(PID_FILE)
}

/// Default log path under the state directory.
pub fn default_log_path() -> PathBuf {
    state_dir().join(LOG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_dir_ends_with_app_dir() {
        assert!(state_dir().ends_with(APP_DIR));
    }

    #[test]
    fn test_default_file_names() {
        assert!(manifest_path().ends_with("daemon.json"));
        assert!(pid_path().ends_with("daemon.pid"));
        assert!(default_log_path().ends_with("lowkey.log"));
    }
}
