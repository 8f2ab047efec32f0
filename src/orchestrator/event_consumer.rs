//! Supervisor event log.
//!
//! Subscribes to [`SupervisorEvent`]s and writes each one to the tracing
//! log. `budget-reached` is logged at `warn` so it stands out as the quest
//! completion cue.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::events::SupervisorEvent;

/// Spawn a background task that logs supervisor events.
///
/// The task runs until the `CancellationToken` fires or the channel closes.
#[must_use]
pub fn spawn_event_consumer(
    mut rx: broadcast::Receiver<SupervisorEvent>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => {
                    info!("event consumer shutting down");
                    break;
                }
                received = rx.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event consumer fell behind");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        info!("event channel closed");
                        break;
                    }
                },
            };

            log_event(&event);
        }
    })
}

fn log_event(event: &SupervisorEvent) {
    match event {
        SupervisorEvent::SessionStarted { game, name, .. } => {
            info!(game_id = %game.id, name = %name, "▶ now playing");
        }
        SupervisorEvent::SessionEnded { catalog_id, reason } => {
            info!(game_id = %catalog_id, ?reason, "■ session ended");
        }
        SupervisorEvent::QueueAdvanced { game } => {
            info!(game_id = %game.id, name = %game.name, "next in queue");
        }
        SupervisorEvent::QueueExhausted => info!("queue finished"),
        SupervisorEvent::LaunchFailed { catalog_id, error } => {
            warn!(game_id = %catalog_id, error = %error, "failed to start game");
        }
        SupervisorEvent::StopFailed { reason, error } => {
            warn!(?reason, error = %error, "failed to stop game");
        }
        SupervisorEvent::BudgetReached {
            catalog_id,
            elapsed_seconds,
        } => {
            warn!(
                game_id = %catalog_id,
                elapsed_seconds,
                "🔔 quest time reached"
            );
        }
    }
}
