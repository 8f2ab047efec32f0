//! Local IPC server for `quest-passer-ctl` commands.
//!
//! Listens on a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! using the `interprocess` crate. Accepts line-delimited JSON commands
//! and routes them to the supervisor, the catalog, or the stores.
//!
//! ## Protocol
//!
//! Request (one JSON object per line):
//! ```json
//! {"command": "status"}
//! {"command": "search", "query": "minecraft"}
//! {"command": "play", "id": "356875570916753438", "name": "Minecraft"}
//! {"command": "enqueue", "id": "356875570916753438"}
//! {"command": "settings", "duration": 900, "notify": true}
//! ```
//!
//! Response (one JSON object per line):
//! ```json
//! {"ok": true, "data": { ... } }
//! {"ok": false, "error": "conflict: a launch is already in flight"}
//! ```

use std::sync::Arc;

use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::catalog;
use crate::models::game::GameRef;
use crate::state::AppState;
use crate::{AppError, Result};

/// Most search hits returned in one response.
const SEARCH_LIMIT: usize = 50;

/// Inbound IPC request from `quest-passer-ctl`.
#[derive(Debug, Default, Deserialize)]
pub struct IpcRequest {
    /// Command verb.
    pub command: String,
    /// Catalog identifier (for `play`, `enqueue`, `remove`, custom games).
    pub id: Option<String>,
    /// Display name override or custom game name.
    pub name: Option<String>,
    /// Search text.
    pub query: Option<String>,
    /// New session duration in seconds.
    pub duration: Option<u64>,
    /// New budget notification flag.
    pub notify: Option<bool>,
}

/// Outbound IPC response to `quest-passer-ctl`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result.and_then(|value| serde_json::to_value(value).map_err(AppError::from)) {
            Ok(data) => Self::success(data),
            Err(err) => Self::error(err.to_string()),
        }
    }
}

/// Spawn the IPC server task.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be created.
pub fn spawn_ipc_server(
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let name = state.config.ipc_name.clone();

    let listener_name = name
        .clone()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Ipc(format!("invalid ipc socket name '{name}': {err}")))?;

    let listener = ListenerOptions::new()
        .name(listener_name)
        .create_tokio()
        .map_err(|err| AppError::Ipc(format!("failed to create ipc listener: {err}")))?;

    info!(ipc_name = %name, "IPC server listening");

    let handle = tokio::spawn(async move {
        let span = info_span!("ipc_server", name = %name);
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("IPC server shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok(stream) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(handle_connection(stream, state));
                            }
                            Err(err) => {
                                warn!(%err, "IPC accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    });

    Ok(handle)
}

/// Handle a single IPC client connection.
async fn handle_connection(
    stream: interprocess::local_socket::tokio::Stream,
    state: Arc<AppState>,
) {
    let span = info_span!("ipc_conn");
    async move {
        let (reader, mut writer) = stream.split();
        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match buf_reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let response = match serde_json::from_str::<IpcRequest>(trimmed) {
                        Ok(request) => dispatch_command(&request, &state).await,
                        Err(err) => IpcResponse::error(format!("invalid json: {err}")),
                    };

                    let mut response_line = serde_json::to_string(&response).unwrap_or_else(|_| {
                        r#"{"ok":false,"error":"serialization failed"}"#.to_owned()
                    });
                    response_line.push('\n');

                    if let Err(err) = writer.write_all(response_line.as_bytes()).await {
                        warn!(%err, "failed to write ipc response");
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "ipc read error");
                    break;
                }
            }
        }

        info!("IPC connection closed");
    }
    .instrument(span)
    .await;
}

/// Route an IPC command to the appropriate handler.
pub async fn dispatch_command(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let span = info_span!("ipc_command", command = %request.command);
    async move {
        match request.command.as_str() {
            "status" => IpcResponse::from_result(state.supervisor.snapshot().await),
            "search" => handle_search(request, state).await,
            "play" => handle_play(request, state).await,
            "stop" => IpcResponse::from_result(state.supervisor.stop().await),
            "enqueue" => handle_enqueue(request, state).await,
            "remove" => handle_remove(request, state).await,
            "clear" => IpcResponse::from_result(state.supervisor.clear_queue().await),
            "arm" => IpcResponse::from_result(state.supervisor.set_armed(true).await),
            "disarm" => IpcResponse::from_result(state.supervisor.set_armed(false).await),
            "settings" => handle_settings(request, state),
            "add-custom" => handle_add_custom(request, state).await,
            "remove-custom" => handle_remove_custom(request, state),
            other => IpcResponse::error(format!("unknown command: {other}")),
        }
    }
    .instrument(span)
    .await
}

fn required<'a>(value: Option<&'a String>, field: &str) -> std::result::Result<&'a str, IpcResponse> {
    value
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| IpcResponse::error(format!("missing required '{field}' field")))
}

/// Find `id` among custom games first, then the catalog.
async fn lookup_game(state: &AppState, id: &str) -> Result<GameRef> {
    let custom = state.custom_games.list()?;
    let catalog = state.catalog.read().await;
    catalog::find_by_id(id, &custom, &catalog)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("game {id}")))
}

async fn handle_search(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let query = request.query.as_deref().unwrap_or_default();
    let custom = match state.custom_games.list() {
        Ok(custom) => custom,
        Err(err) => return IpcResponse::error(err.to_string()),
    };
    let catalog = state.catalog.read().await;
    let mut hits = catalog::search(query, &custom, &catalog);
    hits.truncate(SEARCH_LIMIT);
    IpcResponse::from_result(Ok(hits))
}

async fn handle_play(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let id = match required(request.id.as_ref(), "id") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let result = match lookup_game(state, id).await {
        Ok(game) => state.supervisor.play(game, request.name.clone()).await,
        Err(err) => Err(err),
    };
    IpcResponse::from_result(result)
}

/// Queue a game; arm the queue when nothing is running so it starts right away.
async fn handle_enqueue(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let id = match required(request.id.as_ref(), "id") {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = async {
        let game = lookup_game(state, id).await?;
        let added = state.supervisor.enqueue_and_arm(game).await?;
        Ok::<_, AppError>(serde_json::json!({ "id": id, "added": added }))
    }
    .await;

    IpcResponse::from_result(result)
}

async fn handle_remove(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let id = match required(request.id.as_ref(), "id") {
        Ok(id) => id,
        Err(response) => return response,
    };
    IpcResponse::from_result(
        state
            .supervisor
            .remove(id)
            .await
            .map(|removed| serde_json::json!({ "id": id, "removed": removed })),
    )
}

fn handle_settings(request: &IpcRequest, state: &AppState) -> IpcResponse {
    if request.duration.is_none() && request.notify.is_none() {
        return IpcResponse::from_result(Ok(state.settings.current()));
    }
    IpcResponse::from_result(state.settings.update(|settings| {
        if let Some(duration) = request.duration {
            settings.session_duration_seconds = duration;
        }
        if let Some(notify) = request.notify {
            settings.notify_on_budget_reached = notify;
        }
    }))
}

async fn handle_add_custom(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let (id, name) = match (
        required(request.id.as_ref(), "id"),
        required(request.name.as_ref(), "name"),
    ) {
        (Ok(id), Ok(name)) => (id, name),
        (Err(response), _) | (_, Err(response)) => return response,
    };
    let catalog = state.catalog.read().await;
    IpcResponse::from_result(state.custom_games.add(id, name, &catalog))
}

fn handle_remove_custom(request: &IpcRequest, state: &AppState) -> IpcResponse {
    let id = match required(request.id.as_ref(), "id") {
        Ok(id) => id,
        Err(response) => return response,
    };
    IpcResponse::from_result(
        state
            .custom_games
            .remove(id)
            .map(|()| serde_json::json!({ "id": id, "removed": true })),
    )
}
