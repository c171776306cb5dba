//! `arcade watch`: stream game and device events until Ctrl-C.

use serde_json::Value;

use crate::client::Subscription;
use crate::cmd_device::format_status;

/// Entry point for `arcade watch`.
pub async fn cmd_watch(socket_path: &str) -> anyhow::Result<()> {
    let mut subscription = Subscription::open(socket_path).await?;

    loop {
        tokio::select! {
            next = subscription.next() => match next? {
                Some(message) => {
                    if let Some(line) = format_event(&message) {
                        println!("{line}");
                    }
                }
                None => {
                    println!("daemon went away");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Human-readable form of one notification; `None` for unknown methods.
pub(crate) fn format_event(message: &Value) -> Option<String> {
    let params = &message["params"];
    match message["method"].as_str()? {
        "diyFlipperStatus" => Some(format!("[device] {}", format_status(params))),
        "diyFlipperLine" => Some(format!("[device] < {}", params["line"].as_str()?)),
        "gameExited" => {
            let path = params["gamePath"].as_str()?;
            Some(match params["code"].as_i64() {
                Some(code) => format!("[game] {path} exited with code {code}"),
                None => format!("[game] {path} terminated by signal"),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_known_notifications() {
        let line = json!({"method": "diyFlipperLine", "params": {"line": "PONG"}});
        assert_eq!(format_event(&line).unwrap(), "[device] < PONG");

        let exited = json!({"method": "gameExited", "params": {"gamePath": "games/pong.py", "code": 0}});
        assert_eq!(
            format_event(&exited).unwrap(),
            "[game] games/pong.py exited with code 0"
        );

        let killed = json!({"method": "gameExited", "params": {"gamePath": "g.py", "code": null}});
        assert_eq!(format_event(&killed).unwrap(), "[game] g.py terminated by signal");

        let status = json!({"method": "diyFlipperStatus", "params": {"connected": false, "connecting": true, "autoConnect": true}});
        assert_eq!(format_event(&status).unwrap(), "[device] connecting (auto)");
    }

    #[test]
    fn ignores_unknown() {
        assert!(format_event(&json!({"method": "somethingElse", "params": {}})).is_none());
        assert!(format_event(&json!({"result": {"subscribed": true}})).is_none());
    }
}
