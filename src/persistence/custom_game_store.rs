//! JSON-file store for user-defined games.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;

use crate::models::game::GameRef;
use crate::{AppError, Result};

use super::{read_optional, write_json};

/// Persisted list of custom games, in insertion order.
pub struct CustomGameStore {
    path: Option<PathBuf>,
    games: Mutex<Vec<GameRef>>,
}

impl CustomGameStore {
    /// Open the store at `path`; a missing file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the file cannot be read or parsed.
    pub fn open(path: PathBuf) -> Result<Self> {
        let games = match read_optional(&path)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        Ok(Self {
            path: Some(path),
            games: Mutex::new(games),
        })
    }

    /// A store that never touches the file system.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            games: Mutex::new(Vec::new()),
        }
    }

    /// All custom games.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the lock is poisoned.
    pub fn list(&self) -> Result<Vec<GameRef>> {
        Ok(self.lock()?.clone())
    }

    /// Add a custom game named `name` for catalog id `id`.
    ///
    /// Icon and executables are copied from the catalog entry with the same
    /// id when one is known, so the stand-in still matches detection.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the id or name is blank or the file
    /// cannot be written.
    pub fn add(&self, id: &str, name: &str, catalog: &[GameRef]) -> Result<GameRef> {
        let id = id.trim();
        let name = name.trim();
        if id.is_empty() || name.is_empty() {
            return Err(AppError::Persistence(
                "custom game requires both id and name".into(),
            ));
        }

        let existing = catalog.iter().find(|game| game.id == id);
        let game = GameRef {
            id: id.to_owned(),
            name: name.to_owned(),
            icon: existing.and_then(|g| g.icon.clone()),
            executables: existing.and_then(|g| g.executables.clone()),
        };

        let mut guard = self.lock()?;
        let mut next = guard.clone();
        next.push(game.clone());
        self.persist(&next)?;
        *guard = next;

        info!(game_id = id, name, "custom game added");
        Ok(game)
    }

    /// Remove every custom game with `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no custom game has that id, or
    /// `AppError::Persistence` if the file cannot be written.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut guard = self.lock()?;
        let next: Vec<GameRef> = guard.iter().filter(|g| g.id != id).cloned().collect();
        if next.len() == guard.len() {
            return Err(AppError::NotFound(format!("custom game {id}")));
        }
        self.persist(&next)?;
        *guard = next;

        info!(game_id = id, "custom game removed");
        Ok(())
    }

    fn persist(&self, games: &[GameRef]) -> Result<()> {
        match self.path {
            Some(ref path) => write_json(path, games),
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<GameRef>>> {
        self.games
            .lock()
            .map_err(|_| AppError::Persistence("custom game lock poisoned".into()))
    }
}
