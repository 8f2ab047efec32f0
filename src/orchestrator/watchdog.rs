//! Per-session budget watchdog.
//!
//! Each running session gets a [`Watchdog`] that emits a [`WatchdogTick`]
//! every poll interval. The ticks only carry the session id: the supervisor
//! compares elapsed time against the budget itself, inside its serialized
//! loop, so a tick can never race a concurrent stop. Dropping the
//! [`WatchdogHandle`] cancels the timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

/// A periodic check request for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogTick {
    /// Session the tick belongs to; stale ticks are ignored by the receiver.
    pub session_id: String,
}

/// Builder for a per-session watchdog timer.
pub struct Watchdog {
    session_id: String,
    poll_interval: Duration,
    tick_tx: mpsc::Sender<WatchdogTick>,
    cancel: CancellationToken,
}

impl Watchdog {
    /// Construct a watchdog (does not start the timer yet).
    #[must_use]
    pub fn new(
        session_id: String,
        poll_interval: Duration,
        tick_tx: mpsc::Sender<WatchdogTick>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            poll_interval,
            tick_tx,
            cancel,
        }
    }

    /// Spawn the timer task and return a handle that stops it on drop.
    #[must_use]
    pub fn spawn(self) -> WatchdogHandle {
        let cancel = self.cancel.clone();
        let session_id = self.session_id.clone();
        let span = info_span!("watchdog", session_id = %self.session_id);
        let join_handle = tokio::spawn(self.run().instrument(span));

        WatchdogHandle {
            session_id,
            join_handle: Some(join_handle),
            cancel,
        }
    }

    async fn run(self) {
        let first = Instant::now() + self.poll_interval;
        let mut ticker = interval_at(first, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("watchdog cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let tick = WatchdogTick {
                session_id: self.session_id.clone(),
            };
            if self.tick_tx.send(tick).await.is_err() {
                debug!("tick receiver closed");
                return;
            }
        }
    }
}

/// Handle returned from [`Watchdog::spawn`].
pub struct WatchdogHandle {
    session_id: String,
    join_handle: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl WatchdogHandle {
    /// The session this watchdog checks.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stop the timer and wait for its task to exit.
    pub async fn await_completion(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}
