//! `arcade status|connect|disconnect|send|run`: serial device commands
//! forwarded to the daemon.

use serde_json::{Value, json};

use crate::client::{command_call, rpc_call};

pub async fn cmd_status(socket_path: &str) -> anyhow::Result<()> {
    let status = rpc_call(socket_path, "diyFlipperGetStatus", Value::Null).await?;
    println!("{}", format_status(&status));
    Ok(())
}

pub async fn cmd_connect(socket_path: &str, path: Option<String>) -> anyhow::Result<()> {
    let params = json!({ "preferredPath": path });
    println!("{}", command_call(socket_path, "diyFlipperConnect", params).await?);
    Ok(())
}

pub async fn cmd_disconnect(socket_path: &str) -> anyhow::Result<()> {
    println!(
        "{}",
        command_call(socket_path, "diyFlipperDisconnect", Value::Null).await?
    );
    Ok(())
}

pub async fn cmd_send(socket_path: &str, words: &[String]) -> anyhow::Result<()> {
    let params = json!({ "command": words.join(" ") });
    println!(
        "{}",
        command_call(socket_path, "diyFlipperSendCommand", params).await?
    );
    Ok(())
}

pub async fn cmd_run(socket_path: &str, module: &str) -> anyhow::Result<()> {
    let params = json!({ "moduleKey": module });
    println!(
        "{}",
        command_call(socket_path, "diyFlipperRunModule", params).await?
    );
    Ok(())
}

/// Single-line device status.
pub(crate) fn format_status(status: &Value) -> String {
    let auto = if status["autoConnect"].as_bool() == Some(true) {
        "auto"
    } else {
        "manual"
    };
    let mut out = if status["connected"].as_bool() == Some(true) {
        format!(
            "connected {} ({auto})",
            status["portPath"].as_str().unwrap_or("?")
        )
    } else if status["connecting"].as_bool() == Some(true) {
        format!("connecting ({auto})")
    } else {
        format!("disconnected ({auto})")
    };
    if let Some(error) = status["error"].as_str() {
        out.push_str(&format!(": {error}"));
    }
    out
}
