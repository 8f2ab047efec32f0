#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod errors;
pub mod ipc;
pub mod launcher;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod state;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
