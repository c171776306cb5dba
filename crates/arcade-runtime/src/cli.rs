//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use arcade_core::{Rect, Viewport};

#[derive(Parser)]
#[command(name = "arcade", about = "Kiosk arcade shell supervisor", version)]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/arcade/arcade.sock)
    #[arg(long, short = 's', global = true, env = "ARCADE_SOCKET")]
    pub socket_path: Option<String>,

    /// TOML config file (default: $XDG_CONFIG_HOME/arcade/config.toml if present)
    #[arg(long, short = 'c', global = true, env = "ARCADE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the launcher, serial supervisor and IPC server
    Serve(ServeOpts),
    /// Launch a game through the running daemon
    Launch(LaunchOpts),
    /// Show serial device status
    Status,
    /// List serial ports with their scores (local, no daemon needed)
    Ports,
    /// Connect to the serial device
    Connect {
        /// Exact port path; best-ranked port when omitted
        path: Option<String>,
    },
    /// Disconnect and stop auto-reconnecting
    Disconnect,
    /// Send a raw command line to the device
    Send {
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Run a device module by key (scan, nfc, subghz, badusb, ir, bt, gpio, terminal)
    Run { module: String },
    /// Toggle shell fullscreen
    Fullscreen { state: Toggle },
    /// Stream game and device events
    Watch,
}

#[derive(clap::Args, Default)]
pub struct ServeOpts {
    /// Directory game paths are resolved against
    #[arg(long, env = "ARCADE_GAMES_DIR")]
    pub games_dir: Option<PathBuf>,

    /// Interpreter for .py games
    #[arg(long, env = "ARCADE_PYTHON")]
    pub python: Option<String>,

    /// Display bounds as x,y,width,height
    #[arg(long, value_parser = parse_display)]
    pub display: Option<Rect>,

    /// Serial baud rate
    #[arg(long)]
    pub baud_rate: Option<u32>,

    /// Start with auto-connect disabled
    #[arg(long)]
    pub no_auto_connect: bool,
}

#[derive(clap::Args)]
pub struct LaunchOpts {
    /// Game path relative to the games directory
    pub path: String,

    /// Run inside the shell's viewport instead of fullscreen
    #[arg(long)]
    pub embedded: bool,

    /// Embedded viewport as x,y,width,height
    #[arg(long, value_parser = parse_viewport, requires = "embedded")]
    pub viewport: Option<Viewport>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/arcade/arcade.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/arcade-{user}/arcade.sock")
}

fn split_quad(s: &str) -> Result<[&str; 4], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    <[&str; 4]>::try_from(parts).map_err(|_| format!("expected x,y,width,height, got {s:?}"))
}

pub(crate) fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let [x, y, w, h] = split_quad(s)?;
    let num = |v: &str| v.parse::<f64>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Viewport {
        x: num(x)?,
        y: num(y)?,
        width: num(w)?,
        height: num(h)?,
    })
}

pub(crate) fn parse_display(s: &str) -> Result<Rect, String> {
    let [x, y, w, h] = split_quad(s)?;
    let int = |v: &str| v.parse::<i32>().map_err(|e| format!("{v:?}: {e}"));
    let dim = |v: &str| v.parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Rect::new(int(x)?, int(y)?, dim(w)?, dim(h)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_parses_fractional() {
        let v = parse_viewport("10, 20.5,640,480").unwrap();
        assert_eq!(v.y, 20.5);
        assert_eq!(v.width, 640.0);
    }

    #[test]
    fn quad_needs_four_parts() {
        assert!(parse_viewport("1,2,3").is_err());
        assert!(parse_display("0,0,1920,1080,1").is_err());
    }

    #[test]
    fn display_rejects_negative_size() {
        assert_eq!(parse_display("-1920,0,1920,1080").unwrap().x, -1920);
        assert!(parse_display("0,0,-1,1080").is_err());
    }

    #[test]
    fn launch_viewport_requires_embedded() {
        let err = Cli::try_parse_from(["arcade", "launch", "g.py", "--viewport", "0,0,1,1"]);
        assert!(err.is_err());
        let cli =
            Cli::try_parse_from(["arcade", "launch", "g.py", "--embedded", "--viewport", "0,0,1,1"])
                .unwrap();
        match cli.command {
            Command::Launch(opts) => {
                assert!(opts.embedded);
                assert!(opts.viewport.is_some());
            }
            _ => panic!("expected launch"),
        }
    }

    #[test]
    fn send_joins_words() {
        let cli = Cli::try_parse_from(["arcade", "send", "LED", "ON"]).unwrap();
        match cli.command {
            Command::Send { command } => assert_eq!(command.join(" "), "LED ON"),
            _ => panic!("expected send"),
        }
    }
}
