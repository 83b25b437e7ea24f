//! Change aggregator
//!
//! Records every emitted change and keeps the rolling counters behind the
//! `status`/`summary` surfaces. Critical sections are O(1) apart from the
//! occasional trim of expired timestamps.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use lowkey_core::domain::{Change, Summary};

/// Timestamps older than this are trimmed from the rolling window.
const MAX_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Default)]
struct AggState {
    count: u64,
    last_change: Option<Change>,
    per_directory: std::collections::BTreeMap<PathBuf, u64>,
    recent: VecDeque<DateTime<Utc>>,
}

/// Thread-safe rolling record of observed changes
#[derive(Default)]
pub struct ChangeAggregator {
    state: Mutex<AggState>,
}

impl ChangeAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one change: count first, then the last-change pointer, then
    /// the per-directory bucket keyed by the path's parent.
    pub fn record(&self, change: &Change) {
        let mut state = self.state.lock().expect("aggregator lock poisoned");

        state.count += 1;
        state.last_change = Some(change.clone());

        if let Some(parent) = change.path.parent() {
            if !parent.as_os_str().is_empty() {
                *state
                    .per_directory
                    .entry(parent.to_path_buf())
                    .or_insert(0) += 1;
            }
        }

        state.recent.push_back(change.timestamp);
        let horizon = Utc::now()
            - chrono::Duration::from_std(MAX_WINDOW).expect("window fits chrono range");
        while matches!(state.recent.front(), Some(ts) if *ts < horizon) {
            state.recent.pop_front();
        }

        debug!(count = state.count, path = %change.path.display(), "Recorded change");
    }

    /// Snapshot of the counters, with `recent` restricted to `window`.
    pub fn snapshot(&self, window: Duration) -> Summary {
        let state = self.state.lock().expect("aggregator lock poisoned");
        let horizon =
            Utc::now() - chrono::Duration::from_std(window).expect("window fits chrono range");

        Summary {
            count: state.count,
            recent: state.recent.iter().filter(|ts| **ts >= horizon).count() as u64,
            last_change: state.last_change.clone(),
            per_directory: state.per_directory.clone(),
        }
    }

    /// Total changes recorded.
    pub fn count(&self) -> u64 {
        self.state.lock().expect("aggregator lock poisoned").count
    }
}
