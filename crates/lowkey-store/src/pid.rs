//! PID file handling and process liveness
//!
//! The daemon records its PID in `daemon.pid` under the state directory.
//! Startup refuses to proceed while a live predecessor owns the file; the
//! returned guard removes the file again when dropped, so crashed daemons
//! leave at most a stale file that the next startup detects and replaces.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use lowkey_core::domain::WatchError;

/// Scoped cleanup for a written PID file
///
/// Removes the file on drop. Hold it for the lifetime of the daemon.
#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
}

impl PidGuard {
    /// Path of the PID file being guarded.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed PID file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove PID file"),
        }
    }
}

/// Writes the current process PID to `path` after checking for a live
/// predecessor.
///
/// # Errors
/// Returns [`WatchError::PidCollision`] when the file names a process that
/// is still alive, and [`WatchError::PathIo`] when the directory cannot be
/// created or the file cannot be written.
pub fn write_pid(path: &Path) -> Result<PidGuard, WatchError> {
    if let Some(existing) = read_pid(path) {
        if process_alive(existing) {
            return Err(WatchError::PidCollision(existing));
        }
        info!(pid = existing, "Replacing stale PID file");
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| WatchError::path_io(path, e))?;
    }

    let pid = std::process::id();
    std::fs::write(path, pid.to_string()).map_err(|e| WatchError::path_io(path, e))?;
    info!(pid, path = %path.display(), "Wrote PID file");

    Ok(PidGuard {
        path: path.to_path_buf(),
    })
}

/// Reads a decimal PID from `path`. Any read or parse failure yields `None`.
pub fn read_pid(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.trim().parse().ok()
}

/// Probes whether a process with `pid` is alive.
///
/// On Unix this sends signal 0; EPERM still means the process exists. On
/// Windows there is no cheap equivalent without opening a handle, so a
/// recorded PID is assumed alive.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if result == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    true
}
