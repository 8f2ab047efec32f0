//! Shared application state handed to the IPC server.

use std::sync::Arc;

use crate::catalog::CatalogCache;
use crate::config::GlobalConfig;
use crate::orchestrator::SupervisorHandle;
use crate::persistence::custom_game_store::CustomGameStore;
use crate::persistence::settings_store::SettingsStore;

/// Everything a command handler needs.
pub struct AppState {
    /// Parsed configuration.
    pub config: Arc<GlobalConfig>,
    /// Command surface of the supervisor actor.
    pub supervisor: SupervisorHandle,
    /// Downloaded catalog; empty until the first fetch completes.
    pub catalog: CatalogCache,
    /// User-defined games.
    pub custom_games: Arc<CustomGameStore>,
    /// Durable settings.
    pub settings: Arc<SettingsStore>,
}
