//! `arcade serve`: wire the launcher, serial supervisor and IPC server
//! together and run until a shutdown signal.

use std::sync::Arc;

use arcade_launch::{GameLauncher, ShellWindow, default_python, positioner_for_platform};
use arcade_serial::{SerialSupervisor, SystemSerial};

use crate::config::RuntimeConfig;
use crate::server::{self, AppState};
use crate::shell::HeadlessShell;

/// Run the daemon: starts the reconnect loop and UDS server, waits for a
/// shutdown signal, then closes the serial port.
pub async fn run_daemon(config: RuntimeConfig, socket_path: &str) -> anyhow::Result<()> {
    let games_dir = config.games_dir()?;
    tracing::info!("games directory: {}", games_dir.display());

    let shell: Arc<dyn ShellWindow> = Arc::new(HeadlessShell::new(config.display_rect()));
    let python = config
        .python
        .clone()
        .unwrap_or_else(|| default_python().to_string());
    let positioner = positioner_for_platform(
        config.positioner.attempts,
        config.positioner_interval(),
        &python,
    );
    let launcher = GameLauncher::new(games_dir, shell, positioner).with_python(python);

    let serial = SerialSupervisor::new(SystemSerial, config.supervisor_config());
    let state = Arc::new(AppState {
        launcher,
        serial: serial.clone(),
    });

    serial.start();

    let server_state = Arc::clone(&state);
    let server_socket = socket_path.to_string();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                    }
                }
                Err(e) => {
                    tracing::warn!("cannot register SIGTERM handler: {e}");
                    ctrl_c.await.ok();
                    tracing::info!("received ctrl-c, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    serial.shutdown().await;

    server::remove_socket(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}
