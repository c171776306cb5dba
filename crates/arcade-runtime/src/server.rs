//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON. `subscribe` keeps its
//! connection open and streams notifications until the client hangs up.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::broadcast::error::RecvError;

use arcade_core::{ArcadeError, DeviceEvent, DeviceStatus, GameEvent, LaunchPayload, LaunchResult};
use arcade_launch::GameLauncher;
use arcade_serial::{SerialSupervisor, SerialTransport};

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// Everything the IPC handlers reach.
pub struct AppState<T: SerialTransport> {
    pub launcher: GameLauncher,
    pub serial: SerialSupervisor<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
        }
    }

    fn invalid_params(e: impl std::fmt::Display) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: format!("invalid params: {e}"),
        }
    }

    fn internal(e: impl std::fmt::Display) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: e.to_string(),
        }
    }
}

// ─── Params ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FullscreenParams {
    fullscreen: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConnectParams {
    #[serde(default)]
    preferred_path: Option<String>,
}

#[derive(Deserialize)]
struct SendCommandParams {
    command: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunModuleParams {
    module_key: String,
}

/// Absent params are treated as `{}`.
fn parse_params<P: DeserializeOwned>(params: &Value) -> Result<P, RpcError> {
    let params = if params.is_null() {
        json!({})
    } else {
        params.clone()
    };
    serde_json::from_value(params).map_err(RpcError::invalid_params)
}

// ─── Server ─────────────────────────────────────────────────────────

/// Bind the daemon socket. The parent directory is owner-only (0700) and the
/// socket 0600. A leftover socket nobody answers on is replaced; a live one
/// means another daemon owns it.
pub(crate) async fn bind_socket(socket_path: &str) -> anyhow::Result<UnixListener> {
    let path = Path::new(socket_path);
    let socket_dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path {socket_path}"))?;
    std::fs::create_dir_all(socket_dir)
        .with_context(|| format!("cannot create {}", socket_dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    if path.exists() {
        if tokio::net::UnixStream::connect(path).await.is_ok() {
            anyhow::bail!("another arcade daemon is already running at {socket_path}");
        }
        remove_socket(socket_path);
        tracing::info!("removed stale socket at {socket_path}");
    }

    let listener = UnixListener::bind(path)
        .with_context(|| format!("cannot bind {socket_path}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(listener)
}

/// Remove the socket file, ignoring a missing one.
pub(crate) fn remove_socket(socket_path: &str) {
    if let Err(e) = std::fs::remove_file(socket_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("cannot remove socket {socket_path}: {e}");
        }
    }
}

/// Run the UDS JSON-RPC server.
pub async fn run_server<T: SerialTransport>(
    socket_path: &str,
    state: Arc<AppState<T>>,
) -> anyhow::Result<()> {
    let listener = bind_socket(socket_path).await?;
    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection<T: SerialTransport>(
    stream: tokio::net::UnixStream,
    state: Arc<AppState<T>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: Value = match serde_json::from_str(line.trim()) {
        Ok(request) => request,
        Err(e) => {
            let err = RpcError {
                code: PARSE_ERROR,
                message: format!("parse error: {e}"),
            };
            return write_message(&mut writer, &error_response(Value::Null, err)).await;
        }
    };
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    if method == "subscribe" {
        return stream_events(reader, writer, id, &state).await;
    }

    tracing::debug!(method, "rpc request");
    let response = match dispatch(&state, method, &request["params"]).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err(e) => error_response(id, e),
    };
    write_message(&mut writer, &response).await
}

/// Route one request to the launcher or the serial supervisor.
pub(crate) async fn dispatch<T: SerialTransport>(
    state: &AppState<T>,
    method: &str,
    params: &Value,
) -> Result<Value, RpcError> {
    match method {
        "setFullscreen" => {
            let p: FullscreenParams = parse_params(params)?;
            let success = state.launcher.set_fullscreen(p.fullscreen);
            Ok(json!({ "success": success }))
        }
        "launchGame" => {
            let payload: LaunchPayload =
                serde_json::from_value(params.clone()).map_err(RpcError::invalid_params)?;
            let result = state
                .launcher
                .launch(payload.into())
                .await
                .map(|outcome| outcome.message());
            reply(result)
        }
        "diyFlipperGetStatus" => to_json(&state.serial.status()),
        "diyFlipperListPorts" => to_json(&state.serial.list_ports().await),
        "diyFlipperConnect" => {
            let p: ConnectParams = parse_params(params)?;
            reply(state.serial.connect(p.preferred_path.as_deref()).await)
        }
        "diyFlipperDisconnect" => reply(state.serial.disconnect().await),
        "diyFlipperSendCommand" => {
            let p: SendCommandParams = parse_params(params)?;
            reply(state.serial.send_command(&p.command).await)
        }
        "diyFlipperRunModule" => {
            let p: RunModuleParams = parse_params(params)?;
            reply(state.serial.run_module(&p.module_key).await)
        }
        _ => Err(RpcError::method_not_found(method)),
    }
}

/// Domain failures are replies, not RPC errors: `{success: false, message}`.
fn reply<M: Into<String>>(result: Result<M, ArcadeError>) -> Result<Value, RpcError> {
    to_json(&LaunchResult::from(result))
}

fn to_json<S: serde::Serialize>(value: &S) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::internal)
}

fn error_response(id: Value, e: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {"code": e.code, "message": e.message},
        "id": id,
    })
}

async fn write_message(writer: &mut OwnedWriteHalf, message: &Value) -> anyhow::Result<()> {
    let mut resp = serde_json::to_string(message)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;
    Ok(())
}

// ─── Subscriptions ──────────────────────────────────────────────────

async fn stream_events<T: SerialTransport>(
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    id: Value,
    state: &AppState<T>,
) -> anyhow::Result<()> {
    let mut games = state.launcher.subscribe();
    let mut device = state.serial.subscribe();

    let ack = json!({"jsonrpc": "2.0", "result": {"subscribed": true}, "id": id});
    write_message(&mut writer, &ack).await?;
    write_message(&mut writer, &status_notification(&state.serial.status())).await?;
    tracing::debug!("subscriber attached");

    let mut scratch = String::new();
    loop {
        let message = tokio::select! {
            event = games.recv() => match event {
                Ok(event) => game_notification(&event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "subscriber lagged on game events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            event = device.recv() => match event {
                Ok(event) => device_notification(&event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "subscriber lagged on device events, resyncing");
                    status_notification(&state.serial.status())
                }
                Err(RecvError::Closed) => break,
            },
            read = reader.read_line(&mut scratch) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    scratch.clear();
                    continue;
                }
            },
        };
        if write_message(&mut writer, &message).await.is_err() {
            break;
        }
    }

    tracing::debug!("subscriber detached");
    Ok(())
}

fn notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    })
}

pub(crate) fn status_notification(status: &DeviceStatus) -> Value {
    notification(
        "diyFlipperStatus",
        serde_json::to_value(status).unwrap_or(Value::Null),
    )
}

pub(crate) fn game_notification(event: &GameEvent) -> Value {
    match event {
        GameEvent::Exited { game_path, code } => notification(
            "gameExited",
            json!({"gamePath": game_path, "code": code}),
        ),
    }
}

pub(crate) fn device_notification(event: &DeviceEvent) -> Value {
    match event {
        DeviceEvent::Status(status) => status_notification(status),
        DeviceEvent::Line(line) => notification("diyFlipperLine", json!({ "line": line })),
    }
}
