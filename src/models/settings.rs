//! User-adjustable settings read by the supervisor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest allowed per-session run time.
pub const MIN_SESSION_DURATION_SECS: u64 = 60;
/// Longest allowed per-session run time.
pub const MAX_SESSION_DURATION_SECS: u64 = 3600;
/// Default per-session run time (15m 30s).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 930;
/// Elapsed time at which the one-shot budget notification fires.
///
/// Fixed regardless of the configured session duration.
pub const BUDGET_NOTIFY_THRESHOLD: Duration = Duration::from_secs(930);

/// Persisted user settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// Per-session run time for queued games, clamped to `[60, 3600]`.
    #[serde(default = "default_duration")]
    pub session_duration_seconds: u64,
    /// Emit a `budget-reached` event once per session.
    #[serde(default)]
    pub notify_on_budget_reached: bool,
}

fn default_duration() -> u64 {
    DEFAULT_SESSION_DURATION_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_duration_seconds: DEFAULT_SESSION_DURATION_SECS,
            notify_on_budget_reached: false,
        }
    }
}

impl Settings {
    /// Build settings with the duration clamped into range.
    #[must_use]
    pub fn new(session_duration_seconds: u64, notify_on_budget_reached: bool) -> Self {
        Self {
            session_duration_seconds: clamp_duration(session_duration_seconds),
            notify_on_budget_reached,
        }
    }

    /// Re-apply the duration clamp, e.g. after deserializing a hand-edited file.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.session_duration_seconds, self.notify_on_budget_reached)
    }

    /// Per-session time budget.
    #[must_use]
    pub fn session_budget(&self) -> Duration {
        Duration::from_secs(clamp_duration(self.session_duration_seconds))
    }
}

/// Clamp a session duration into `[MIN_SESSION_DURATION_SECS, MAX_SESSION_DURATION_SECS]`.
#[must_use]
pub fn clamp_duration(seconds: u64) -> u64 {
    seconds.clamp(MIN_SESSION_DURATION_SECS, MAX_SESSION_DURATION_SECS)
}

