#![forbid(unsafe_code)]

//! `quest-passer`: session and queue supervisor binary.
//!
//! Bootstraps configuration, loads the settings and custom game stores,
//! downloads the game catalog, starts the supervisor actor with its exit
//! monitor, and serves the IPC socket for `quest-passer-ctl`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use quest_passer::catalog::{CatalogCache, CatalogClient};
use quest_passer::config::GlobalConfig;
use quest_passer::ipc::server::spawn_ipc_server;
use quest_passer::launcher::spawner::ProcessLauncher;
use quest_passer::orchestrator::child_monitor::spawn_child_monitor;
use quest_passer::orchestrator::event_consumer::spawn_event_consumer;
use quest_passer::orchestrator::{Supervisor, SupervisorConfig};
use quest_passer::persistence::custom_game_store::CustomGameStore;
use quest_passer::persistence::settings_store::SettingsStore;
use quest_passer::state::AppState;
use quest_passer::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "quest-passer", about = "Game session and queue supervisor", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("quest-passer bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = Arc::new(GlobalConfig::load_from_path(&args.config)?);
    info!(
        data_dir = %config.data_dir.display(),
        games_dir = %config.games_dir.display(),
        platform = %config.platform,
        "configuration loaded"
    );

    // ── Open stores ─────────────────────────────────────
    let settings = Arc::new(SettingsStore::open(
        config.settings_path(),
        config.initial_settings(),
    )?);
    let custom_games = Arc::new(CustomGameStore::open(config.custom_games_path())?);
    info!("stores opened");

    let ct = CancellationToken::new();

    // ── Download the catalog in the background ──────────
    let catalog: CatalogCache = Arc::new(RwLock::new(Vec::new()));
    let catalog_handle = spawn_catalog_fetch(&config, Arc::clone(&catalog), ct.clone());

    // ── Start the supervisor ────────────────────────────
    let launcher = ProcessLauncher::from_config(&config);
    let children = launcher.children();
    let supervisor = Supervisor::spawn(
        SupervisorConfig::from_global(&config),
        Arc::new(launcher),
        Arc::clone(&settings),
        ct.clone(),
    );
    let handle = supervisor.handle();

    let monitor_handle = spawn_child_monitor(
        children,
        handle.clone(),
        config.monitor_interval(),
        ct.clone(),
    );
    let events_handle = spawn_event_consumer(handle.subscribe(), ct.clone());
    info!("supervisor started");

    // ── Serve IPC ───────────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        supervisor: handle,
        catalog,
        custom_games,
        settings,
    });
    let ipc_handle = spawn_ipc_server(state, ct.clone()).map_err(|err| {
        error!(%err, "ipc server failed to start");
        err
    })?;

    info!("quest-passer ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // Stops the running session before returning.
    supervisor.shutdown().await;

    // ── Wait for background tasks ───────────────────────
    let _ = tokio::join!(catalog_handle, monitor_handle, events_handle, ipc_handle);
    info!("quest-passer shut down");

    Ok(())
}

/// Download the catalog once and publish it into `cache`.
fn spawn_catalog_fetch(
    config: &GlobalConfig,
    cache: CatalogCache,
    ct: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let client = CatalogClient::new(&config.catalog);
    tokio::spawn(async move {
        tokio::select! {
            () = ct.cancelled() => {}
            result = client.fetch() => match result {
                Ok(games) => *cache.write().await = games,
                Err(err) => warn!(%err, "catalog unavailable, only custom games can be searched"),
            },
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
