//! Events the supervisor publishes for observers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::game::GameRef;
use crate::models::session::EndReason;

/// Supervisor-level notifications, delivered at most once per occurrence.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SupervisorEvent {
    /// A stand-in process was confirmed started.
    SessionStarted {
        /// Game that was launched.
        game: GameRef,
        /// Name the stand-in shows.
        name: String,
        /// Wall-clock start time.
        started_at: DateTime<Utc>,
    },
    /// The active session ended.
    SessionEnded {
        /// Catalog id of the game that ended.
        catalog_id: String,
        /// Why it ended.
        reason: EndReason,
    },
    /// The front queue entry was taken as the next session.
    QueueAdvanced {
        /// Game about to be launched.
        game: GameRef,
    },
    /// The queue ran dry while armed; the queue is now disarmed.
    QueueExhausted,
    /// A launch attempt failed; no session was created.
    LaunchFailed {
        /// Catalog id of the game that failed.
        catalog_id: String,
        /// Launcher error text.
        error: String,
    },
    /// A stop attempt failed; the session is still considered running.
    StopFailed {
        /// What triggered the stop.
        reason: EndReason,
        /// Launcher error text.
        error: String,
    },
    /// The session crossed the quest notification threshold.
    BudgetReached {
        /// Catalog id of the running game.
        catalog_id: String,
        /// Seconds elapsed when the threshold was observed.
        elapsed_seconds: u64,
    },
}
