//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// A second session or launch was requested while one is active.
    Conflict(String),
    /// The launcher failed to start the stand-in process.
    Launch(String),
    /// The launcher failed to stop the stand-in process.
    Termination(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Catalog download or decoding failure.
    Catalog(String),
    /// Settings or custom game store failure.
    Persistence(String),
    /// IPC communication failure.
    Ipc(String),
    /// Staging path escaped the games directory.
    PathViolation(String),
    /// The supervisor is no longer accepting commands.
    Shutdown(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Launch(msg) => write!(f, "launch: {msg}"),
            Self::Termination(msg) => write!(f, "termination: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Catalog(msg) => write!(f, "catalog: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence: {msg}"),
            Self::Ipc(msg) => write!(f, "ipc: {msg}"),
            Self::PathViolation(msg) => write!(f, "path violation: {msg}"),
            Self::Shutdown(msg) => write!(f, "shutdown: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Catalog(err.to_string())
    }
}
