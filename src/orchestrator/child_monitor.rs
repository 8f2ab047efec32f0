//! Child process monitor: the exit event source for the supervisor.
//!
//! Periodically polls every stand-in in the `ActiveChildren` registry. When
//! one has exited (crash, external kill, or normal exit) it is removed from
//! the registry and reported to the supervisor.

use std::process::ExitStatus;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::supervisor::SupervisorHandle;
use crate::launcher::ActiveChildren;

/// Spawn a background task that reports stand-in exits to the supervisor.
///
/// The task polls every `interval` until the `CancellationToken` fires.
#[must_use]
pub fn spawn_child_monitor(
    children: ActiveChildren,
    supervisor: SupervisorHandle,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("child process monitor shutting down");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }

            for (exe, status) in poll_children(&children).await {
                info!(exe = %exe, status = %describe_exit(status), "stand-in process exited");
                if let Err(err) = supervisor.report_exit(exe).await {
                    warn!(%err, "failed to report process exit");
                }
            }
        }
    })
}

/// Remove and return every exited child in the registry.
pub async fn poll_children(children: &ActiveChildren) -> Vec<(String, Option<ExitStatus>)> {
    let mut guard = children.lock().await;
    let mut exited = Vec::new();

    for (exe, child) in guard.iter_mut() {
        match child.try_wait() {
            Ok(Some(status)) => exited.push((exe.clone(), Some(status))),
            Ok(None) => {}
            Err(err) => {
                warn!(exe = %exe, %err, "failed to poll child process status");
                // Treat as exited to clean up the dead entry.
                exited.push((exe.clone(), None));
            }
        }
    }

    for (exe, _) in &exited {
        guard.remove(exe);
    }
    exited
}

/// Human-readable exit description.
#[must_use]
pub fn describe_exit(status: Option<ExitStatus>) -> String {
    status.map_or_else(
        || "status unknown".to_owned(),
        |s| {
            if s.success() {
                "exited normally (code 0)".to_owned()
            } else {
                s.code().map_or_else(
                    || "terminated by signal".to_owned(),
                    |c| format!("exited with code {c}"),
                )
            }
        },
    )
}
