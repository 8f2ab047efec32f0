//! Persistence layer modules.
//!
//! Only settings and the custom game list survive a restart; the session
//! and queue live in memory inside the supervisor.

pub mod custom_game_store;
pub mod settings_store;

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::{AppError, Result};

/// Write `value` as pretty JSON, creating parent directories first.
///
/// Writes to a sibling temp file and renames it over `path` so a crash never
/// leaves a truncated file behind.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::Persistence(format!(
                "failed to create directory {}: {err}",
                parent.display()
            ))
        })?;
    }

    let body = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|err| {
        AppError::Persistence(format!("failed to write {}: {err}", tmp.display()))
    })?;
    fs::rename(&tmp, path).map_err(|err| {
        AppError::Persistence(format!("failed to replace {}: {err}", path.display()))
    })
}

/// Read `path` if it exists; `Ok(None)` when the file is missing.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AppError::Persistence(format!(
            "failed to read {}: {err}",
            path.display()
        ))),
    }
}
