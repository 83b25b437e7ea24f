//! State-directory lifecycle: manifest, log, and PID file working together

use std::path::PathBuf;

use lowkey_core::domain::Manifest;
use lowkey_core::paths;
use lowkey_store::{read_pid, write_pid, ManifestStore, RotatingLog};

#[test]
fn fresh_state_dir_boots_empty() {
    let state = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(state.path().to_path_buf());

    assert!(store.load().unwrap().is_none());
    assert_eq!(read_pid(&state.path().join(paths::PID_FILE)), None);
}

#[test]
fn full_daemon_state_round_trip() {
    let state = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(state.path().to_path_buf());

    // Persist a manifest the way `lowkey start` does
    let mut manifest = Manifest::new(vec![PathBuf::from("/abs/b"), PathBuf::from("/abs/a")]);
    manifest.ignore_file = Some(PathBuf::from("/abs/a/.lowkey"));
    store.save(&manifest).unwrap();

    // Claim the PID file the way `lowkeyd` does
    let pid_path = state.path().join(paths::PID_FILE);
    let guard = write_pid(&pid_path).unwrap();
    assert_eq!(read_pid(&pid_path), Some(std::process::id()));

    // Write some change-log traffic
    let log = RotatingLog::open_default(state.path().join(paths::LOG_FILE)).unwrap();
    log.write_line("[2026-03-14 12:00:00] [NEW] a.txt (5 bytes)").unwrap();
    log.write_line("[2026-03-14 12:00:01] [DELETED] a.txt").unwrap();

    // Everything is where the next process expects it
    let loaded = store.load().unwrap().expect("manifest persisted");
    assert_eq!(
        loaded.directories,
        vec![PathBuf::from("/abs/a"), PathBuf::from("/abs/b")]
    );
    assert_eq!(loaded.ignore_file, Some(PathBuf::from("/abs/a/.lowkey")));

    let log_content =
        std::fs::read_to_string(state.path().join(paths::LOG_FILE)).unwrap();
    assert_eq!(log_content.lines().count(), 2);

    // Graceful shutdown removes the PID file, clear removes the manifest
    drop(guard);
    assert!(!pid_path.exists());
    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
}

#[test]
fn manifest_diff_drives_reconcile_decisions() {
    let state = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(state.path().to_path_buf());

    let running = Manifest::new(vec![PathBuf::from("/abs/a"), PathBuf::from("/abs/b")]);
    store.save(&running).unwrap();

    // Another process rewrites the desired state
    let desired = Manifest::new(vec![PathBuf::from("/abs/a"), PathBuf::from("/abs/c")]);
    store.save(&desired).unwrap();

    let on_disk = store.load().unwrap().unwrap();
    let diff = running.diff(&on_disk);
    assert_eq!(diff.added, vec![PathBuf::from("/abs/c")]);
    assert_eq!(diff.removed, vec![PathBuf::from("/abs/b")]);
}
