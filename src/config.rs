//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::settings::Settings;
use crate::{AppError, Result};

/// Watchdog timing configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WatchdogConfig {
    /// Seconds between session budget checks.
    #[serde(default = "default_watchdog_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_seconds: default_watchdog_poll_seconds(),
        }
    }
}

/// Exit monitor timing configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Milliseconds between child process exit polls.
    #[serde(default = "default_monitor_poll_millis")]
    pub poll_millis: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_millis: default_monitor_poll_millis(),
        }
    }
}

/// Remote game catalog sources.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CatalogConfig {
    /// JSON list endpoints, merged in order.
    #[serde(default = "default_catalog_sources")]
    pub sources: Vec<String>,
    /// Base URL for application icons.
    #[serde(default = "default_icon_cdn")]
    pub icon_cdn: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sources: default_catalog_sources(),
            icon_cdn: default_icon_cdn(),
        }
    }
}

/// Seed values written to a fresh settings file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SettingsDefaults {
    /// Per-session run time for queued games.
    #[serde(default = "default_session_duration")]
    pub session_duration_seconds: u64,
    /// Whether to announce when a session crosses the quest threshold.
    #[serde(default)]
    pub notify_on_budget_reached: bool,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            session_duration_seconds: default_session_duration(),
            notify_on_budget_reached: false,
        }
    }
}

fn default_watchdog_poll_seconds() -> u64 {
    5
}

fn default_monitor_poll_millis() -> u64 {
    1000
}

fn default_catalog_sources() -> Vec<String> {
    vec![
        "https://discord.com/api/applications/detectable".into(),
        "https://gist.githubusercontent.com/DeadSix27/b8e377c9fed6d98bff22dcdf8807e207/raw/52d1f2d31be7168a0486a3a355e06a2d751bdc44/gameslist.json".into(),
    ]
}

fn default_icon_cdn() -> String {
    "https://cdn.discordapp.com/app-icons".into()
}

fn default_session_duration() -> u64 {
    crate::models::settings::DEFAULT_SESSION_DURATION_SECS
}

fn default_platform() -> String {
    "win32".into()
}

fn default_ipc_name() -> String {
    "quest-passer".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Directory holding `settings.json` and `custom_games.json`.
    pub data_dir: PathBuf,
    /// Root under which stand-in executables are staged.
    pub games_dir: PathBuf,
    /// Stand-in binary copied for every launched game.
    pub runner_path: PathBuf,
    /// Catalog OS key used to pick the stand-in executable name.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Named pipe / Unix socket identifier.
    #[serde(default = "default_ipc_name")]
    pub ipc_name: String,
    /// Budget watchdog timing.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Exit monitor timing.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Catalog endpoints.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Initial settings when no settings file exists yet.
    #[serde(default)]
    pub defaults: SettingsDefaults,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Interval between watchdog ticks.
    #[must_use]
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog.poll_seconds)
    }

    /// Interval between exit monitor polls.
    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_millis)
    }

    /// Settings used when the settings file does not exist yet.
    #[must_use]
    pub fn initial_settings(&self) -> Settings {
        Settings::new(
            self.defaults.session_duration_seconds,
            self.defaults.notify_on_budget_reached,
        )
    }

    /// Path of the persisted settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Path of the persisted custom game list.
    #[must_use]
    pub fn custom_games_path(&self) -> PathBuf {
        self.data_dir.join("custom_games.json")
    }

    fn validate(&self) -> Result<()> {
        if self.watchdog.poll_seconds == 0 {
            return Err(AppError::Config(
                "watchdog.poll_seconds must be greater than zero".into(),
            ));
        }

        if self.monitor.poll_millis == 0 {
            return Err(AppError::Config(
                "monitor.poll_millis must be greater than zero".into(),
            ));
        }

        if self.platform.trim().is_empty() {
            return Err(AppError::Config("platform must not be empty".into()));
        }

        if self.ipc_name.trim().is_empty() {
            return Err(AppError::Config("ipc_name must not be empty".into()));
        }

        Ok(())
    }
}
