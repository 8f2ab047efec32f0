//! Launcher adapter: starts and stops stand-in processes.
//!
//! The [`Launcher`] trait is the seam between the supervisor and the
//! operating system. [`spawner::ProcessLauncher`] is the real
//! implementation; tests drive the supervisor with an in-memory fake.

pub mod path_safety;
pub mod spawner;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::Mutex;

use crate::Result;

/// Live stand-in processes keyed by executable name.
pub type ActiveChildren = Arc<Mutex<HashMap<String, Child>>>;

/// Everything needed to start one stand-in process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Catalog identifier; selects the staging folder.
    pub catalog_id: String,
    /// Title the stand-in shows.
    pub display_name: String,
    /// Sanitized executable path relative to the staging folder.
    pub executable_name: String,
    /// Optional icon the stand-in shows.
    pub icon_url: Option<String>,
}

/// Acknowledgement of a successful launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchHandle {
    /// OS process id, when the platform reports one.
    pub pid: Option<u32>,
}

/// Starts and stops stand-in processes.
pub trait Launcher: Send + Sync {
    /// Stage and start the stand-in described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Launch`](crate::AppError::Launch) if the process
    /// could not be started, or
    /// [`AppError::PathViolation`](crate::AppError::PathViolation) if the
    /// executable path escapes the games directory.
    fn launch(
        &self,
        request: LaunchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchHandle>> + Send + '_>>;

    /// Stop the stand-in running as `executable_name`.
    ///
    /// Stopping a process that is no longer running succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Termination`](crate::AppError::Termination) if the
    /// process may still be running.
    fn terminate(
        &self,
        executable_name: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
