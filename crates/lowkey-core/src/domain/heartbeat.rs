//! Supervisor heartbeat
//!
//! The heartbeat is the liveness record the supervisor publishes on every
//! probe. `restarts` is monotonic; everything else reflects the latest
//! probe outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness record published by the supervisor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Whether the supervised manager reported running at the last probe
    pub running: bool,
    /// When the last probe ran
    pub last_check: Option<DateTime<Utc>>,
    /// When the running state last transitioned
    pub last_change: Option<DateTime<Utc>>,
    /// Message from the most recent failed start attempt, empty when healthy
    pub last_error: String,
    /// How many times the supervisor restarted the manager; only increases
    pub restarts: u64,
    /// When the current backoff window expires, if one is active
    pub backoff_until: Option<DateTime<Utc>>,
}
