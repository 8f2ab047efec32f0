//! Session and queue supervisor.
//!
//! A single actor task owns the session tracker and the queue. Commands from
//! the UI, process-exit reports and watchdog ticks all arrive through its
//! mailbox and are handled one at a time, so no two of them can interleave
//! reads and writes of supervisor state.
//!
//! While a launch is in flight the actor keeps serving its mailbox:
//! queue edits and snapshots are answered immediately, `play` is rejected
//! with `AppError::Conflict`, and stop requests and exit reports are
//! deferred until the launch has settled. An exit reported during the launch
//! therefore ends the new session right after it starts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::events::SupervisorEvent;
use super::queue::GameQueue;
use super::session_tracker::SessionTracker;
use super::watchdog::{Watchdog, WatchdogHandle, WatchdogTick};
use crate::config::GlobalConfig;
use crate::launcher::{LaunchHandle, LaunchRequest, Launcher};
use crate::models::game::GameRef;
use crate::models::session::{EndReason, Session};
use crate::models::settings::{Settings, BUDGET_NOTIFY_THRESHOLD};
use crate::persistence::settings_store::SettingsStore;
use crate::{AppError, Result};

const MAILBOX_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 128;
const TICK_CAPACITY: usize = 8;

/// Static supervisor parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Catalog OS key used to resolve executables.
    pub platform: String,
    /// Base URL for icons passed to the stand-in.
    pub icon_cdn: String,
    /// Watchdog poll interval.
    pub watchdog_interval: Duration,
}

impl SupervisorConfig {
    /// Derive supervisor parameters from the global configuration.
    #[must_use]
    pub fn from_global(config: &GlobalConfig) -> Self {
        Self {
            platform: config.platform.clone(),
            icon_cdn: config.catalog.icon_cdn.clone(),
            watchdog_interval: config.watchdog_interval(),
        }
    }
}

/// Coarse supervisor state; `armed` is tracked separately.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorPhase {
    /// No session and no launch in flight.
    Idle,
    /// A launch is in flight.
    Starting,
    /// A session is active.
    Running,
}

/// Immutable view of supervisor state for observers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SupervisorSnapshot {
    /// Current phase.
    pub phase: SupervisorPhase,
    /// Active session, if any.
    pub session: Option<Session>,
    /// Queued games, front first.
    pub queue: Vec<GameRef>,
    /// Whether the queue advances automatically.
    pub armed: bool,
    /// Settings in effect.
    pub settings: Settings,
    /// When the running session plus every queued game would be done.
    pub estimated_finish: Option<DateTime<Utc>>,
}

/// Commands that change or observe the session.
enum Command {
    Play {
        game: GameRef,
        name_override: Option<String>,
        reply: oneshot::Sender<Result<Session>>,
    },
    Stop {
        reply: oneshot::Sender<Result<()>>,
    },
    ProcessExited {
        executable_name: String,
    },
    Edit(Edit),
}

/// Commands that never touch the session and are safe during a launch.
enum Edit {
    Enqueue {
        game: GameRef,
        arm_if_idle: bool,
        reply: oneshot::Sender<bool>,
    },
    Remove {
        catalog_id: String,
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<usize>,
    },
    SetArmed {
        armed: bool,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SupervisorSnapshot>,
    },
}

/// Cloneable command surface for the supervisor actor.
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<SupervisorEvent>,
}

impl SupervisorHandle {
    /// Start `game` now, shown as `name_override` when given.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if a session is active or a launch is in
    /// flight, or the launcher's error if the launch failed.
    pub async fn play(&self, game: GameRef, name_override: Option<String>) -> Result<Session> {
        self.request(|reply| Command::Play {
            game,
            name_override,
            reply,
        })
        .await?
    }

    /// Stop the active session; a no-op when idle.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Termination` if the process could not be stopped;
    /// the session stays active in that case.
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await?
    }

    /// Queue `game`. Returns `false` if its id was already queued.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn enqueue(&self, game: GameRef) -> Result<bool> {
        self.request(|reply| {
            Command::Edit(Edit::Enqueue {
                game,
                arm_if_idle: false,
                reply,
            })
        })
        .await
    }

    /// Queue `game` and, if nothing is running or launching and the queue is
    /// not armed, arm it so the front entry starts right away.
    /// The idle check and the arming are one mailbox step.
    ///
    /// Returns `false` if its id was already queued.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn enqueue_and_arm(&self, game: GameRef) -> Result<bool> {
        self.request(|reply| {
            Command::Edit(Edit::Enqueue {
                game,
                arm_if_idle: true,
                reply,
            })
        })
        .await
    }

    /// Remove `catalog_id` from the queue. Returns `false` if it was not queued.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn remove(&self, catalog_id: &str) -> Result<bool> {
        let catalog_id = catalog_id.to_owned();
        self.request(|reply| Command::Edit(Edit::Remove { catalog_id, reply }))
            .await
    }

    /// Empty the queue. Returns how many entries were dropped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn clear_queue(&self) -> Result<usize> {
        self.request(|reply| Command::Edit(Edit::Clear { reply }))
            .await
    }

    /// Enable or disable automatic queue advancement.
    ///
    /// Arming while idle starts the front entry immediately.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn set_armed(&self, armed: bool) -> Result<()> {
        self.request(|reply| Command::Edit(Edit::SetArmed { armed, reply }))
            .await
    }

    /// Current state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn snapshot(&self) -> Result<SupervisorSnapshot> {
        self.request(|reply| Command::Edit(Edit::Snapshot { reply }))
            .await
    }

    /// Report that the stand-in named `executable_name` exited.
    ///
    /// Reports for anything but the active session's executable are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if the supervisor has stopped.
    pub async fn report_exit(&self, executable_name: impl Into<String>) -> Result<()> {
        let executable_name = executable_name.into();
        self.tx
            .send(Command::ProcessExited { executable_name })
            .await
            .map_err(|_| AppError::Shutdown("supervisor is not running".into()))
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| AppError::Shutdown("supervisor is not running".into()))?;
        response
            .await
            .map_err(|_| AppError::Shutdown("supervisor dropped the request".into()))
    }
}

/// Owner of the supervisor actor task.
pub struct Supervisor {
    handle: SupervisorHandle,
    join_handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Spawn the actor.
    ///
    /// The actor and its watchdogs stop when `cancel` fires or [`Self::shutdown`] is called.
    #[must_use]
    pub fn spawn(
        config: SupervisorConfig,
        launcher: Arc<dyn Launcher>,
        settings: Arc<SettingsStore>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (tick_tx, ticks) = mpsc::channel(TICK_CAPACITY);

        let actor = Actor {
            config,
            launcher,
            settings,
            tracker: SessionTracker::new(),
            queue: GameQueue::new(),
            events: events.clone(),
            mailbox,
            tick_tx,
            ticks,
            watchdog: None,
            deferred: VecDeque::new(),
            cancel: cancel.clone(),
        };
        let join_handle = tokio::spawn(actor.run().instrument(info_span!("supervisor")));

        Self {
            handle: SupervisorHandle { tx, events },
            join_handle,
            cancel,
        }
    }

    /// A new handle to the actor.
    #[must_use]
    pub fn handle(&self) -> SupervisorHandle {
        self.handle.clone()
    }

    /// Stop the actor and wait for it to finish.
    ///
    /// A running session is stopped first; an in-flight launch runs to
    /// completion before the actor exits.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.join_handle.await {
            warn!(%err, "supervisor task ended abnormally");
        }
    }
}

struct Actor {
    config: SupervisorConfig,
    launcher: Arc<dyn Launcher>,
    settings: Arc<SettingsStore>,
    tracker: SessionTracker,
    queue: GameQueue,
    events: broadcast::Sender<SupervisorEvent>,
    mailbox: mpsc::Receiver<Command>,
    tick_tx: mpsc::Sender<WatchdogTick>,
    ticks: mpsc::Receiver<WatchdogTick>,
    watchdog: Option<WatchdogHandle>,
    deferred: VecDeque<Command>,
    cancel: CancellationToken,
}

impl Actor {
    async fn run(mut self) {
        info!("supervisor started");
        loop {
            if let Some(command) = self.deferred.pop_front() {
                self.handle(command).await;
                continue;
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                command = self.mailbox.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(tick) = self.ticks.recv() => self.on_tick(tick).await,
            }
        }

        if let Some(watchdog) = self.watchdog.take() {
            debug!(session_id = %watchdog.session_id(), "waiting for watchdog");
            watchdog.await_completion().await;
        }
        if let Err(err) = self.stop_session(EndReason::Manual).await {
            warn!(%err, "could not stop the running session during shutdown");
        }
        info!("supervisor stopped");
    }

    fn phase(&self) -> SupervisorPhase {
        if self.tracker.is_starting() {
            SupervisorPhase::Starting
        } else if self.tracker.current().is_some() {
            SupervisorPhase::Running
        } else {
            SupervisorPhase::Idle
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Play {
                game,
                name_override,
                reply,
            } => {
                let result = self.play(game, name_override).await;
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                let result = self.stop_session(EndReason::Manual).await;
                let _ = reply.send(result);
            }
            Command::ProcessExited { executable_name } => {
                self.on_process_exited(&executable_name);
            }
            Command::Edit(edit) => self.apply_edit(edit),
        }
        self.advance().await;
    }

    /// Mailbox handling while the launch latch is held.
    fn handle_while_starting(&mut self, command: Command) {
        match command {
            Command::Play { game, reply, .. } => {
                debug!(game_id = %game.id, "play rejected, launch in flight");
                let _ = reply.send(Err(AppError::Conflict(
                    "a launch is already in flight".into(),
                )));
            }
            deferred @ (Command::Stop { .. } | Command::ProcessExited { .. }) => {
                self.deferred.push_back(deferred);
            }
            Command::Edit(edit) => self.apply_edit(edit),
        }
    }

    fn apply_edit(&mut self, edit: Edit) {
        match edit {
            Edit::Enqueue {
                game,
                arm_if_idle,
                reply,
            } => {
                let game_id = game.id.clone();
                let added = self.queue.enqueue(game);
                if added {
                    info!(game_id = %game_id, queued = self.queue.len(), "game queued");
                } else {
                    debug!(game_id = %game_id, "game already queued");
                }
                if arm_if_idle && self.phase() == SupervisorPhase::Idle && !self.queue.is_armed() {
                    self.queue.set_armed(true);
                    info!("queue armed by enqueue");
                }
                let _ = reply.send(added);
            }
            Edit::Remove { catalog_id, reply } => {
                let removed = self.queue.remove(&catalog_id);
                debug!(game_id = %catalog_id, removed, "queue removal");
                let _ = reply.send(removed);
            }
            Edit::Clear { reply } => {
                let dropped = self.queue.clear();
                info!(dropped, "queue cleared");
                let _ = reply.send(dropped);
            }
            Edit::SetArmed { armed, reply } => {
                self.queue.set_armed(armed);
                info!(armed, "queue armed flag set");
                let _ = reply.send(());
            }
            Edit::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn play(&mut self, game: GameRef, name_override: Option<String>) -> Result<Session> {
        self.tracker.try_reserve()?;

        let display_name = name_override
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| game.name.clone());
        let executable_name = game.resolve_executable(&self.config.platform);
        let request = LaunchRequest {
            catalog_id: game.id.clone(),
            display_name: display_name.clone(),
            executable_name: executable_name.clone(),
            icon_url: game.icon_url(&self.config.icon_cdn),
        };

        info!(game_id = %game.id, name = %display_name, exe = %executable_name, "launching");
        let outcome = self.launch_while_serving(request).await;
        self.tracker.release();

        match outcome {
            Ok(handle) => {
                let session = self.tracker.begin(&game, display_name, executable_name)?;
                self.watchdog = Some(
                    Watchdog::new(
                        session.id.clone(),
                        self.config.watchdog_interval,
                        self.tick_tx.clone(),
                        self.cancel.child_token(),
                    )
                    .spawn(),
                );
                info!(
                    game_id = %game.id,
                    session_id = %session.id,
                    pid = handle.pid.unwrap_or(0),
                    "session started"
                );
                self.emit(SupervisorEvent::SessionStarted {
                    game,
                    name: session.display_name.clone(),
                    started_at: session.started_at,
                });
                Ok(session)
            }
            Err(err) => {
                warn!(game_id = %game.id, %err, "launch failed");
                self.emit(SupervisorEvent::LaunchFailed {
                    catalog_id: game.id,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Await the launch while answering the mailbox.
    async fn launch_while_serving(&mut self, request: LaunchRequest) -> Result<LaunchHandle> {
        let launcher = Arc::clone(&self.launcher);
        let mut launch = launcher.launch(request);

        loop {
            tokio::select! {
                result = &mut launch => return result,
                Some(command) = self.mailbox.recv() => self.handle_while_starting(command),
            }
        }
    }

    async fn stop_session(&mut self, reason: EndReason) -> Result<()> {
        let Some(executable_name) = self
            .tracker
            .current()
            .map(|session| session.executable_name.clone())
        else {
            debug!(?reason, "stop requested while idle");
            return Ok(());
        };

        match self.launcher.terminate(executable_name).await {
            Ok(()) => {
                self.finish_session(reason);
                Ok(())
            }
            Err(err) => {
                warn!(?reason, %err, "stop failed, session still running");
                self.emit(SupervisorEvent::StopFailed {
                    reason,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn on_process_exited(&mut self, executable_name: &str) {
        let matches = self
            .tracker
            .current()
            .is_some_and(|session| session.executable_name == executable_name);
        if !matches {
            debug!(exe = %executable_name, "exit reported for no active session");
            return;
        }
        self.finish_session(EndReason::External);
    }

    fn finish_session(&mut self, reason: EndReason) {
        self.watchdog = None;
        if let Some(session) = self.tracker.end() {
            info!(
                game_id = %session.catalog_id,
                session_id = %session.id,
                elapsed_secs = session.elapsed().as_secs(),
                ?reason,
                "session ended"
            );
            self.emit(SupervisorEvent::SessionEnded {
                catalog_id: session.catalog_id,
                reason,
            });
        }
    }

    /// Start queued games while idle and armed; disarm once the queue runs dry.
    async fn advance(&mut self) {
        while self.phase() == SupervisorPhase::Idle && self.queue.is_armed() {
            // Commands held during the last launch go first; the run loop
            // replays them and advances again afterwards.
            if !self.deferred.is_empty() {
                debug!(held = self.deferred.len(), "settling held commands before advancing");
                return;
            }

            let Some(entry) = self.queue.dequeue_front() else {
                self.queue.set_armed(false);
                info!("queue exhausted");
                self.emit(SupervisorEvent::QueueExhausted);
                return;
            };

            info!(game_id = %entry.game.id, remaining = self.queue.len(), "advancing queue");
            self.emit(SupervisorEvent::QueueAdvanced {
                game: entry.game.clone(),
            });
            if let Err(err) = self.play(entry.game, None).await {
                warn!(%err, "queued game did not start");
            }
        }
    }

    async fn on_tick(&mut self, tick: WatchdogTick) {
        let Some((catalog_id, elapsed)) = self
            .tracker
            .current()
            .filter(|session| session.id == tick.session_id)
            .map(|session| (session.catalog_id.clone(), session.elapsed()))
        else {
            debug!(session_id = %tick.session_id, "stale watchdog tick");
            return;
        };

        let settings = self.settings.current();

        if settings.notify_on_budget_reached
            && elapsed >= BUDGET_NOTIFY_THRESHOLD
            && self.tracker.mark_budget_notified()
        {
            info!(game_id = %catalog_id, "quest threshold reached");
            self.emit(SupervisorEvent::BudgetReached {
                catalog_id,
                elapsed_seconds: elapsed.as_secs(),
            });
        }

        if self.queue.is_armed() && elapsed >= settings.session_budget() {
            info!(elapsed_secs = elapsed.as_secs(), "session time limit reached");
            // A failed stop is retried on the next tick.
            if self.stop_session(EndReason::TimeLimit).await.is_ok() {
                self.advance().await;
            }
        }
    }

    fn snapshot(&self) -> SupervisorSnapshot {
        let settings = self.settings.current();
        let budget = settings.session_budget();
        let session = self.tracker.current().cloned();

        let estimated_finish = if session.is_some() || !self.queue.is_empty() {
            let active_remaining = session
                .as_ref()
                .map_or(Duration::ZERO, |s| s.remaining(budget));
            Some(
                self.queue
                    .peek_estimated_finish(Utc::now(), active_remaining, budget),
            )
        } else {
            None
        };

        SupervisorSnapshot {
            phase: self.phase(),
            session,
            queue: self.queue.entries().map(|entry| entry.game.clone()).collect(),
            armed: self.queue.is_armed(),
            settings,
            estimated_finish,
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        if self.events.send(event).is_err() {
            debug!("no event subscribers");
        }
    }
}
