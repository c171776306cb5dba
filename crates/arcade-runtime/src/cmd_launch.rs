//! `arcade launch` and `arcade fullscreen`.

use serde_json::json;

use arcade_core::{LaunchMode, LaunchRequest};

use crate::cli::{LaunchOpts, Toggle};
use crate::client::{command_call, rpc_call};

pub async fn cmd_launch(socket_path: &str, opts: LaunchOpts) -> anyhow::Result<()> {
    let request = build_request(opts);
    let params = serde_json::to_value(&request)?;
    println!("{}", command_call(socket_path, "launchGame", params).await?);
    Ok(())
}

pub async fn cmd_fullscreen(socket_path: &str, state: Toggle) -> anyhow::Result<()> {
    let params = json!({ "fullscreen": state == Toggle::On });
    let result = rpc_call(socket_path, "setFullscreen", params).await?;
    if result["success"].as_bool() != Some(true) {
        anyhow::bail!("shell window unavailable");
    }
    Ok(())
}

pub(crate) fn build_request(opts: LaunchOpts) -> LaunchRequest {
    LaunchRequest {
        game_path: opts.path,
        mode: if opts.embedded {
            LaunchMode::Embedded
        } else {
            LaunchMode::External
        },
        viewport: opts.viewport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::Viewport;

    #[test]
    fn embedded_request_serializes_camel_case() {
        let request = build_request(LaunchOpts {
            path: "games/pong.py".into(),
            embedded: true,
            viewport: Some(Viewport {
                x: 10.0,
                y: 20.0,
                width: 640.0,
                height: 480.0,
            }),
        });
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["gamePath"], "games/pong.py");
        assert_eq!(v["mode"], "embedded");
        assert_eq!(v["viewport"]["width"], 640.0);
    }

    #[test]
    fn external_by_default() {
        let request = build_request(LaunchOpts {
            path: "games/pong.py".into(),
            embedded: false,
            viewport: None,
        });
        assert_eq!(request.mode, LaunchMode::External);
    }
}
