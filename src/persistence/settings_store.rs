//! JSON-file settings store.

use std::path::PathBuf;
use std::sync::RwLock;

use tracing::{info, warn};

use crate::models::settings::Settings;
use crate::{AppError, Result};

use super::{read_optional, write_json};

/// Durable key-value store for [`Settings`].
///
/// Reads are served from an in-memory copy; every update is written through
/// to disk before it becomes visible.
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Open the store at `path`, seeding it with `defaults` when the file is missing.
    ///
    /// A file that fails to parse is reported and replaced by `defaults` in
    /// memory; it is only overwritten on the next update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the file exists but cannot be read.
    pub fn open(path: PathBuf, defaults: Settings) -> Result<Self> {
        let settings = match read_optional(&path)? {
            Some(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(parsed) => parsed.normalized(),
                Err(err) => {
                    warn!(path = %path.display(), %err, "settings file unreadable, using defaults");
                    defaults.normalized()
                }
            },
            None => {
                info!(path = %path.display(), "no settings file, using defaults");
                defaults.normalized()
            }
        };

        Ok(Self {
            path: Some(path),
            current: RwLock::new(settings),
        })
    }

    /// A store that never touches the file system.
    #[must_use]
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            current: RwLock::new(settings.normalized()),
        }
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn current(&self) -> Settings {
        match self.current.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Apply `change`, clamp the result, persist it and return it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the file cannot be written; the
    /// in-memory value is left unchanged in that case.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| AppError::Persistence("settings lock poisoned".into()))?;

        let mut next = *guard;
        change(&mut next);
        let next = next.normalized();

        if let Some(ref path) = self.path {
            write_json(path, &next)?;
        }
        *guard = next;

        info!(
            duration_secs = next.session_duration_seconds,
            notify = next.notify_on_budget_reached,
            "settings updated"
        );
        Ok(next)
    }
}
