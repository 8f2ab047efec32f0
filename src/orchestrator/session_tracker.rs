//! Single-session bookkeeping.

use crate::models::game::GameRef;
use crate::models::session::Session;
use crate::{AppError, Result};

/// Holds at most one [`Session`] plus the launch-in-flight latch.
#[derive(Debug, Default)]
pub struct SessionTracker {
    session: Option<Session>,
    starting: bool,
    budget_notified: bool,
}

impl SessionTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the launch latch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if a session exists or a launch is already in flight.
    pub fn try_reserve(&mut self) -> Result<()> {
        self.ensure_free()?;
        self.starting = true;
        Ok(())
    }

    /// Release the launch latch.
    pub fn release(&mut self) {
        self.starting = false;
    }

    /// Record a confirmed launch as the active session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if a session exists or the latch is still held.
    pub fn begin(
        &mut self,
        game: &GameRef,
        chosen_name: String,
        executable_name: String,
    ) -> Result<Session> {
        self.ensure_free()?;
        let session = Session::new(game.id.clone(), chosen_name, executable_name);
        self.session = Some(session.clone());
        self.budget_notified = false;
        Ok(session)
    }

    /// Clear the active session; a no-op when there is none.
    pub fn end(&mut self) -> Option<Session> {
        self.budget_notified = false;
        self.session.take()
    }

    /// The active session, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether a launch is in flight.
    #[must_use]
    pub fn is_starting(&self) -> bool {
        self.starting
    }

    /// Record that the budget notification fired; `true` only the first time per session.
    pub fn mark_budget_notified(&mut self) -> bool {
        if self.session.is_none() || self.budget_notified {
            return false;
        }
        self.budget_notified = true;
        true
    }

    fn ensure_free(&self) -> Result<()> {
        if let Some(ref session) = self.session {
            return Err(AppError::Conflict(format!(
                "'{}' is already running",
                session.display_name
            )));
        }
        if self.starting {
            return Err(AppError::Conflict("a launch is already in flight".into()));
        }
        Ok(())
    }
}
