//! Stand-in process spawner.
//!
//! Copies the runner binary to `<games_dir>/<catalog_id>/bin/<executable>`
//! so that activity detection sees the expected executable path, then starts
//! it with `--title` (and `--icon` when known). Children are spawned with
//! `kill_on_drop(true)` and tracked in an [`ActiveChildren`] registry so
//! they can be stopped by executable name and polled for exits.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};

use super::path_safety::resolve_within;
use super::{ActiveChildren, LaunchHandle, LaunchRequest, Launcher};
use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// Sub-folder of each game folder that receives the stand-in.
const STAGING_SUBDIR: &str = "bin";

/// How long a stand-in gets to exit after a polite terminate request.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// [`Launcher`] backed by real child processes.
pub struct ProcessLauncher {
    games_dir: PathBuf,
    runner_path: PathBuf,
    children: ActiveChildren,
    grace: Duration,
}

impl ProcessLauncher {
    /// Build a launcher that stages copies of `runner_path` under `games_dir`.
    #[must_use]
    pub fn new(games_dir: PathBuf, runner_path: PathBuf) -> Self {
        Self {
            games_dir,
            runner_path,
            children: Arc::new(Mutex::new(HashMap::new())),
            grace: TERMINATE_GRACE,
        }
    }

    /// Build a launcher from the global configuration.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.games_dir.clone(), config.runner_path.clone())
    }

    /// Override the terminate grace period.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Shared registry of live children, for the exit monitor.
    #[must_use]
    pub fn children(&self) -> ActiveChildren {
        Arc::clone(&self.children)
    }

    /// Copy the runner into the staging folder for `request`.
    ///
    /// Returns the path of the staged executable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::PathViolation` if the catalog id or executable name
    /// escapes its folder, or `AppError::Launch` if the runner is missing or
    /// the copy fails.
    pub async fn stage(&self, request: &LaunchRequest) -> Result<PathBuf> {
        if !tokio::fs::try_exists(&self.runner_path).await.unwrap_or(false) {
            return Err(AppError::Launch(format!(
                "runner executable not found at {}",
                self.runner_path.display()
            )));
        }

        create_dir(&self.games_dir).await?;
        let game_dir = resolve_within(&self.games_dir, &request.catalog_id)?;
        let staging_dir = game_dir.join(STAGING_SUBDIR);
        create_dir(&staging_dir).await?;

        let target = resolve_within(&staging_dir, &request.executable_name)?;
        if let Some(parent) = target.parent() {
            create_dir(parent).await?;
        }

        debug!(
            from = %self.runner_path.display(),
            to = %target.display(),
            "copying runner"
        );
        tokio::fs::copy(&self.runner_path, &target)
            .await
            .map_err(|err| {
                AppError::Launch(format!(
                    "failed to copy runner to {}: {err}",
                    target.display()
                ))
            })?;

        Ok(target)
    }

    async fn spawn(&self, request: LaunchRequest) -> Result<LaunchHandle> {
        let staged = self.stage(&request).await?;
        let working_dir = staged
            .parent()
            .map_or_else(|| self.games_dir.clone(), Path::to_path_buf);

        let mut cmd = Command::new(&staged);
        cmd.arg("--title").arg(&request.display_name);
        if let Some(ref url) = request.icon_url {
            cmd.arg("--icon").arg(url);
        }
        cmd.current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|err| AppError::Launch(format!("failed to start process: {err}")))?;
        let pid = child.id();

        let mut guard = self.children.lock().await;
        if let Some(mut stale) = guard.insert(request.executable_name.clone(), child) {
            warn!(exe = %request.executable_name, "replacing stale tracked process");
            if let Err(err) = stale.start_kill() {
                warn!(exe = %request.executable_name, %err, "failed to kill stale process");
            }
        }
        drop(guard);

        info!(pid = pid.unwrap_or(0), exe = %request.executable_name, "stand-in process started");
        Ok(LaunchHandle { pid })
    }

    async fn stop(&self, executable_name: String) -> Result<()> {
        let tracked = self.children.lock().await.remove(&executable_name);

        let Some(mut child) = tracked else {
            return stop_untracked(&executable_name).await;
        };

        match stop_child(&mut child, self.grace).await {
            Ok(()) => {
                info!(exe = %executable_name, "stand-in process stopped");
                Ok(())
            }
            Err(err) => {
                // The process may still be alive; keep tracking it so a retry can find it.
                self.children.lock().await.insert(executable_name, child);
                Err(err)
            }
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        request: LaunchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchHandle>> + Send + '_>> {
        let span = info_span!(
            "launch",
            game_id = %request.catalog_id,
            exe = %request.executable_name
        );
        Box::pin(self.spawn(request).instrument(span))
    }

    fn terminate(
        &self,
        executable_name: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let span = info_span!("terminate", exe = %executable_name);
        Box::pin(self.stop(executable_name).instrument(span))
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|err| {
        AppError::Launch(format!("failed to create {}: {err}", path.display()))
    })
}

/// Ask `child` to exit, wait up to `grace`, then force-kill it.
async fn stop_child(child: &mut Child, grace: Duration) -> Result<()> {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(?status, "process already exited");
        return Ok(());
    }

    if request_graceful_exit(child) {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(?status, "process exited after terminate request");
                return Ok(());
            }
            Ok(Err(err)) => {
                warn!(%err, "error waiting for process");
            }
            Err(_) => {
                warn!("process did not exit within grace period, forcing kill");
            }
        }
    }

    child
        .kill()
        .await
        .map_err(|err| AppError::Termination(format!("failed to kill process: {err}")))
}

#[cfg(unix)]
fn request_graceful_exit(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(raw) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(err) => {
            warn!(pid = raw, %err, "failed to send SIGTERM");
            false
        }
    }
}

#[cfg(not(unix))]
fn request_graceful_exit(_child: &Child) -> bool {
    false
}

/// Stop a process this launcher did not start (or already reaped).
#[cfg(windows)]
async fn stop_untracked(executable_name: &str) -> Result<()> {
    let image = Path::new(&executable_name.replace('/', "\\"))
        .file_name()
        .map_or_else(|| executable_name.to_owned(), |n| n.to_string_lossy().into_owned());

    let output = Command::new("taskkill")
        .arg("/F")
        .arg("/IM")
        .arg(&image)
        .output()
        .await
        .map_err(|err| AppError::Termination(format!("failed to execute taskkill: {err}")))?;

    if output.status.success() {
        info!(image = %image, "stopped untracked process");
        Ok(())
    } else {
        Err(AppError::Termination(format!(
            "taskkill failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// Stop a process this launcher did not start (or already reaped).
#[cfg(not(windows))]
#[allow(clippy::unused_async)] // Mirrors the Windows signature.
async fn stop_untracked(executable_name: &str) -> Result<()> {
    debug!(exe = executable_name, "no tracked process, nothing to stop");
    Ok(())
}
