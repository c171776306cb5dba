//! arcade: kiosk arcade shell supervisor binary.
//! Launches games on behalf of the shell UI and bridges the serial
//! "hacker" device, exposing both over a local JSON-RPC socket.

use clap::Parser;

mod cli;
mod client;
mod cmd_device;
mod cmd_launch;
mod cmd_ports;
mod cmd_watch;
mod config;
mod daemon;
mod server;
mod shell;

fn init_tracing(default: &str) {
    let filter = std::env::var("ARCADE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);
    // Clients only surface problems; the daemon logs its lifecycle.
    init_tracing(if matches!(args.command, cli::Command::Serve(_)) {
        "info"
    } else {
        "warn"
    });

    match args.command {
        cli::Command::Serve(opts) => {
            tracing::info!("arcade daemon starting");

            let mut config = config::RuntimeConfig::load(args.config.as_deref())?;
            config.apply(&opts);
            daemon::run_daemon(config, &socket_path).await?;
        }
        cli::Command::Launch(opts) => {
            cmd_launch::cmd_launch(&socket_path, opts).await?;
        }
        cli::Command::Fullscreen { state } => {
            cmd_launch::cmd_fullscreen(&socket_path, state).await?;
        }
        cli::Command::Status => {
            cmd_device::cmd_status(&socket_path).await?;
        }
        cli::Command::Ports => {
            cmd_ports::cmd_ports().await?;
        }
        cli::Command::Connect { path } => {
            cmd_device::cmd_connect(&socket_path, path).await?;
        }
        cli::Command::Disconnect => {
            cmd_device::cmd_disconnect(&socket_path).await?;
        }
        cli::Command::Send { command } => {
            cmd_device::cmd_send(&socket_path, &command).await?;
        }
        cli::Command::Run { module } => {
            cmd_device::cmd_run(&socket_path, &module).await?;
        }
        cli::Command::Watch => {
            cmd_watch::cmd_watch(&socket_path).await?;
        }
    }

    Ok(())
}
