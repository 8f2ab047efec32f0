//! Session and queue supervision.
//!
//! Covers the single-session tracker, the play queue, the per-session
//! budget watchdog, the supervisor actor that serializes every command and
//! event, the exit monitor feeding it, and the event log consumer.

pub mod child_monitor;
pub mod event_consumer;
pub mod events;
pub mod queue;
pub mod session_tracker;
pub mod supervisor;
pub mod watchdog;

pub use events::SupervisorEvent;
pub use supervisor::{Supervisor, SupervisorConfig, SupervisorHandle, SupervisorPhase, SupervisorSnapshot};
