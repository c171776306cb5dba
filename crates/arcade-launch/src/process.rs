//! Ownership of a spawned game process until it exits.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

/// How long output pumps may keep draining after the process is gone.
const PUMP_DRAIN: Duration = Duration::from_millis(250);

/// A running game process and its output subscriptions.
///
/// Created at spawn time. [`wait_exit`](Self::wait_exit) consumes the handle,
/// so exit is observed exactly once and the pumps are released with it.
pub struct GameProcessHandle {
    game_path: String,
    child: Child,
    pumps: Vec<JoinHandle<()>>,
}

impl GameProcessHandle {
    /// Take ownership of `child`, forwarding any piped stdout/stderr to the log.
    pub fn new(game_path: impl Into<String>, mut child: Child) -> Self {
        let game_path = game_path.into();
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump_lines(stdout, game_path.clone(), Stream::Stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump_lines(stderr, game_path.clone(), Stream::Stderr)));
        }
        Self {
            game_path,
            child,
            pumps,
        }
    }

    pub fn game_path(&self) -> &str {
        &self.game_path
    }

    /// OS process id, if the process has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to terminate and release its pumps.
    ///
    /// Returns the exit code, or `None` if it was killed by a signal or the
    /// wait itself failed.
    pub async fn wait_exit(mut self) -> Option<i32> {
        let code = match self.child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(game = %self.game_path, "waiting on game process failed: {e}");
                None
            }
        };

        for mut pump in self.pumps.drain(..) {
            if tokio::time::timeout(PUMP_DRAIN, &mut pump).await.is_err() {
                pump.abort();
            }
        }
        code
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

async fn pump_lines<R: AsyncRead + Unpin>(reader: R, game: String, stream: Stream) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match stream {
                Stream::Stdout => tracing::info!(target: "arcade::game", game = %game, "{line}"),
                Stream::Stderr => tracing::warn!(target: "arcade::game", game = %game, "{line}"),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(target: "arcade::game", game = %game, "output stream closed: {e}");
                break;
            }
        }
    }
}
