//! Active session model.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

/// The single currently running stand-in process.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Unique run identifier; distinguishes repeated runs of the same game.
    pub id: String,
    /// Catalog identifier of the game.
    pub catalog_id: String,
    /// Name shown for the running process (may differ from the catalog name).
    pub display_name: String,
    /// Resolved stand-in executable name, relative to the staging folder.
    pub executable_name: String,
    /// Wall-clock start time for display.
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    started: Instant,
}

impl Session {
    /// Construct a session starting now.
    #[must_use]
    pub fn new(catalog_id: String, display_name: String, executable_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            catalog_id,
            display_name,
            executable_name,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Monotonic time since the session started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Budget left before `budget` is used up; zero once exceeded.
    #[must_use]
    pub fn remaining(&self, budget: Duration) -> Duration {
        budget.saturating_sub(self.elapsed())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// Stopped by an explicit user command.
    Manual,
    /// The process exited on its own or was killed outside the supervisor.
    External,
    /// Stopped by the watchdog after the session budget elapsed.
    TimeLimit,
}
