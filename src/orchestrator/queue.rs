//! FIFO play queue with an independent armed flag.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::models::game::GameRef;

/// A game waiting for its turn.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct QueueEntry {
    /// The queued game.
    pub game: GameRef,
    /// When it was queued.
    pub enqueued_at: DateTime<Utc>,
}

/// Ordered backlog; each catalog id appears at most once.
#[derive(Debug, Default)]
pub struct GameQueue {
    entries: VecDeque<QueueEntry>,
    armed: bool,
}

impl GameQueue {
    /// Empty, disarmed queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `game` unless its id is already queued. Returns whether it was added.
    pub fn enqueue(&mut self, game: GameRef) -> bool {
        if self.contains(&game.id) {
            return false;
        }
        self.entries.push_back(QueueEntry {
            game,
            enqueued_at: Utc::now(),
        });
        true
    }

    /// Remove and return the head.
    pub fn dequeue_front(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Remove the entry for `catalog_id`. Returns whether one was present.
    pub fn remove(&mut self, catalog_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.game.id != catalog_id);
        self.entries.len() != before
    }

    /// Drop every entry; the armed flag is left alone. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Whether `catalog_id` is queued.
    #[must_use]
    pub fn contains(&self, catalog_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.game.id == catalog_id)
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries, front first.
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Whether automatic advancement is enabled.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Enable or disable automatic advancement.
    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    /// When the whole queue would be done if every slot ran `per_slot`.
    ///
    /// `active_remaining` is the time left on the running session, zero if none.
    #[must_use]
    pub fn peek_estimated_finish(
        &self,
        now: DateTime<Utc>,
        active_remaining: Duration,
        per_slot: Duration,
    ) -> DateTime<Utc> {
        let slots = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        let total = per_slot.saturating_mul(slots).saturating_add(active_remaining);
        TimeDelta::from_std(total)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
