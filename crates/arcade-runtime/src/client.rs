//! UDS JSON-RPC client for CLI subcommands.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

fn request(method: &str, params: Value) -> anyhow::Result<String> {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    Ok(req)
}

async fn connect(socket_path: &str) -> anyhow::Result<UnixStream> {
    UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))
}

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: Value,
) -> anyhow::Result<Value> {
    let stream = connect(socket_path).await?;
    let (reader, mut writer) = stream.into_split();

    writer.write_all(request(method, params)?.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// Call a command that replies `{success, message}`; failure becomes an error.
pub(crate) async fn command_call(
    socket_path: &str,
    method: &str,
    params: Value,
) -> anyhow::Result<String> {
    let result = rpc_call(socket_path, method, params).await?;
    let message = result["message"].as_str().unwrap_or_default().to_string();
    if result["success"].as_bool() == Some(true) {
        Ok(message)
    } else {
        anyhow::bail!("{message}")
    }
}

/// Open `subscribe` stream. The write half stays open: the server treats
/// EOF from the client as unsubscribe.
pub(crate) struct Subscription {
    lines: Lines<BufReader<OwnedReadHalf>>,
    _writer: OwnedWriteHalf,
}

impl Subscription {
    pub async fn open(socket_path: &str) -> anyhow::Result<Self> {
        let stream = connect(socket_path).await?;
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(request("subscribe", Value::Null)?.as_bytes())
            .await?;

        let mut lines = BufReader::new(reader).lines();
        let ack: Value = match lines.next_line().await? {
            Some(line) => serde_json::from_str(&line)?,
            None => anyhow::bail!("daemon closed the subscription"),
        };
        if let Some(error) = ack.get("error") {
            anyhow::bail!("RPC error: {error}");
        }
        Ok(Self {
            lines,
            _writer: writer,
        })
    }

    /// Next notification, or `None` when the daemon goes away.
    pub async fn next(&mut self) -> anyhow::Result<Option<Value>> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(serde_json::from_str(&line)?)),
            None => Ok(None),
        }
    }
}
