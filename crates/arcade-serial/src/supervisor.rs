//! SerialSupervisor: owns the one open connection to the device.
//!
//! At most one port is open at a time and at most one connect attempt is in
//! flight. Every status change is pushed through the [`StatusBroadcaster`]
//! while the state lock is held, so subscribers see changes in order.
//!
//! Each installed link gets a generation number. Reader tasks only touch
//! state while their generation is still the current link, so a late
//! close or error from a superseded port cannot clobber a newer one.
//! A separate epoch counter is bumped by `disconnect`/`shutdown` so a
//! connect attempt that finishes afterwards is discarded instead of
//! reinstalling a link the user just tore down. Such a stale attempt no
//! longer holds the single-flight gate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use arcade_core::{
    ArcadeError, DeviceEvent, DeviceStatus, HANDSHAKE_LINES, SerialLineBuffer,
    SerialPortCandidate, run_command_line,
};

use crate::broadcast::StatusBroadcaster;
use crate::registry::SerialDeviceRegistry;
use crate::transport::SerialTransport;

const READ_CHUNK: usize = 1024;
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
const MIN_RECONNECT_INTERVAL: Duration = Duration::from_millis(1);

/// Supervisor tuning.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub baud_rate: u32,
    pub reconnect_interval: Duration,
    /// Initial value of `DeviceStatus::auto_connect`.
    pub auto_connect: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            reconnect_interval: Duration::from_millis(3000),
            auto_connect: true,
        }
    }
}

/// Who asked for a connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// User request: re-enables auto-connect, reports gate conflicts as errors.
    Explicit,
    /// Background loop: silently skips unless auto-connect is on and idle.
    Auto,
}

struct Link<P> {
    generation: u64,
    path: String,
    writer: Arc<AsyncMutex<WriteHalf<P>>>,
    cancel: CancellationToken,
}

struct State<P> {
    status: DeviceStatus,
    link: Option<Link<P>>,
    /// Epoch of the attempt holding the single-flight gate.
    attempt_in_flight: Option<u64>,
    epoch: u64,
    next_generation: u64,
}

struct Shared<T: SerialTransport> {
    transport: Arc<T>,
    registry: SerialDeviceRegistry<T>,
    config: SupervisorConfig,
    state: Mutex<State<T::Port>>,
    broadcaster: StatusBroadcaster,
    shutdown: CancellationToken,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

/// Serial connection supervisor. Cheap to clone; clones share one connection.
pub struct SerialSupervisor<T: SerialTransport> {
    shared: Arc<Shared<T>>,
}

impl<T: SerialTransport> Clone for SerialSupervisor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: SerialTransport> SerialSupervisor<T> {
    pub fn new(transport: T, config: SupervisorConfig) -> Self {
        Self::with_broadcaster(transport, config, StatusBroadcaster::new())
    }

    pub fn with_broadcaster(
        transport: T,
        config: SupervisorConfig,
        broadcaster: StatusBroadcaster,
    ) -> Self {
        let transport = Arc::new(transport);
        let status = DeviceStatus {
            auto_connect: config.auto_connect,
            ..DeviceStatus::default()
        };
        Self {
            shared: Arc::new(Shared {
                registry: SerialDeviceRegistry::new(Arc::clone(&transport)),
                transport,
                config,
                state: Mutex::new(State {
                    status,
                    link: None,
                    attempt_in_flight: None,
                    epoch: 0,
                    next_generation: 1,
                }),
                broadcaster,
                shutdown: CancellationToken::new(),
                reconnect_task: Mutex::new(None),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T::Port>> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the state and publish the status if it changed.
    fn update<R>(&self, f: impl FnOnce(&mut State<T::Port>) -> R) -> R {
        let mut state = self.lock();
        let before = state.status.clone();
        let out = f(&mut state);
        debug_assert!(state.status.is_consistent(), "{:?}", state.status);
        if state.status != before {
            self.shared.broadcaster.publish_status(&state.status);
        }
        out
    }

    // ─── Queries ────────────────────────────────────────────────────

    /// Snapshot of the current status.
    pub fn status(&self) -> DeviceStatus {
        self.lock().status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.shared.broadcaster.subscribe()
    }

    /// Ranked list of ports, best guess first.
    pub async fn list_ports(&self) -> Vec<SerialPortCandidate> {
        self.shared.registry.list_candidates().await
    }

    // ─── Connect ────────────────────────────────────────────────────

    /// Open a port. With `preferred`, only that exact path is tried;
    /// otherwise candidates are tried best-first. Re-enables auto-connect.
    ///
    /// Returns a human-readable success message.
    pub async fn connect(&self, preferred: Option<&str>) -> Result<String, ArcadeError> {
        match self.connect_with(preferred, Trigger::Explicit).await? {
            Some(message) => Ok(message),
            None => Err(ArcadeError::AlreadyConnecting),
        }
    }

    /// Returns `Ok(None)` when an `Auto` attempt was skipped by the gate.
    async fn connect_with(
        &self,
        preferred: Option<&str>,
        trigger: Trigger,
    ) -> Result<Option<String>, ArcadeError> {
        let Some(epoch) = self.begin_attempt(trigger)? else {
            return Ok(None);
        };

        let result = self.attempt(preferred, epoch).await;

        self.update(|state| {
            if state.attempt_in_flight == Some(epoch) {
                state.attempt_in_flight = None;
            }
            if let Err(e) = &result {
                if state.epoch == epoch && state.link.is_none() {
                    state.status.mark_disconnected(Some(e.to_string()));
                }
            }
        });

        match &result {
            Ok(path) => tracing::info!(port = %path, "serial device connected"),
            Err(e) => match trigger {
                Trigger::Explicit => tracing::warn!("serial connect failed: {e}"),
                Trigger::Auto => tracing::debug!("serial auto-connect failed: {e}"),
            },
        }

        let path = result?;
        self.send_handshake().await;
        Ok(Some(format!("Connected to {path}")))
    }

    /// Single-flight gate. Marks the attempt in flight and returns its epoch.
    /// An attempt from an earlier epoch does not hold the gate.
    fn begin_attempt(&self, trigger: Trigger) -> Result<Option<u64>, ArcadeError> {
        self.update(|state| {
            let in_flight = state.attempt_in_flight == Some(state.epoch);
            let busy = state.link.is_some() || in_flight;
            if trigger == Trigger::Auto && (busy || !state.status.auto_connect) {
                return Ok(None);
            }
            if let Some(link) = &state.link {
                return Err(ArcadeError::AlreadyConnected(link.path.clone()));
            }
            if in_flight {
                return Err(ArcadeError::AlreadyConnecting);
            }
            if trigger == Trigger::Explicit {
                state.status.auto_connect = true;
            }
            state.attempt_in_flight = Some(state.epoch);
            state.status.mark_connecting();
            Ok(Some(state.epoch))
        })
    }

    /// Try candidates in order; install the first port that opens.
    async fn attempt(&self, preferred: Option<&str>, epoch: u64) -> Result<String, ArcadeError> {
        let ports = self.shared.registry.list_candidates().await;
        let candidates: Vec<SerialPortCandidate> = match preferred {
            Some(path) => {
                let matching: Vec<_> = ports.into_iter().filter(|p| p.path == path).collect();
                if matching.is_empty() {
                    return Err(ArcadeError::PortNotFound(path.to_string()));
                }
                matching
            }
            None if ports.is_empty() => return Err(ArcadeError::NoPortsFound),
            None => ports,
        };

        let mut failures = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self
                .shared
                .transport
                .open(&candidate.path, self.shared.config.baud_rate)
            {
                Ok(port) => return self.install(candidate.path, port, epoch),
                Err(e) => {
                    tracing::debug!(port = %candidate.path, "serial open failed: {e}");
                    failures.push(format!("{}: {e}", candidate.path));
                }
            }
        }
        Err(ArcadeError::ConnectFailed(failures.join("; ")))
    }

    /// Make `port` the current link and start its reader.
    fn install(&self, path: String, port: T::Port, epoch: u64) -> Result<String, ArcadeError> {
        let (reader, writer) = tokio::io::split(port);
        self.update(|state| {
            if state.epoch != epoch {
                return Err(ArcadeError::ConnectFailed(
                    "cancelled by disconnect".to_string(),
                ));
            }
            let generation = state.next_generation;
            state.next_generation += 1;
            let cancel = self.shared.shutdown.child_token();
            tokio::spawn(self.clone().read_loop(generation, reader, cancel.clone()));
            state.link = Some(Link {
                generation,
                path: path.clone(),
                writer: Arc::new(AsyncMutex::new(writer)),
                cancel,
            });
            state.status.mark_connected(path.clone());
            Ok(path)
        })
    }

    /// Greet the device. Replies are not awaited.
    async fn send_handshake(&self) {
        let Some((generation, writer)) = self.current_writer() else {
            return;
        };
        for line in HANDSHAKE_LINES {
            if let Err(e) = write_line(&*writer, line).await {
                tracing::debug!("handshake write failed: {e}");
                break;
            }
            self.touch(generation);
        }
    }

    /// Record a successful exchange on link `generation`.
    fn touch(&self, generation: u64) {
        self.update(|state| {
            if is_current(state, generation) {
                state.status.touch(Utc::now());
            }
        });
    }

    // ─── Reader ─────────────────────────────────────────────────────

    async fn read_loop(
        self,
        generation: u64,
        mut reader: ReadHalf<T::Port>,
        cancel: CancellationToken,
    ) {
        let mut framer = SerialLineBuffer::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        let reason = loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                result = reader.read(&mut chunk) => match result {
                    Ok(0) => break "Device disconnected".to_string(),
                    Ok(n) => {
                        for line in framer.push(&chunk[..n]) {
                            self.on_line(generation, line);
                        }
                    }
                    Err(e) => break ArcadeError::SerialError(e.to_string()).to_string(),
                },
            }
        };
        self.on_link_lost(generation, reason);
    }

    fn on_line(&self, generation: u64, line: String) {
        let mut state = self.lock();
        if !is_current(&state, generation) {
            return;
        }
        state.status.touch(Utc::now());
        self.shared.broadcaster.publish_status(&state.status);
        tracing::trace!(%line, "serial line");
        self.shared.broadcaster.publish_line(line);
    }

    fn on_link_lost(&self, generation: u64, reason: String) {
        self.update(|state| {
            if !is_current(state, generation) {
                return;
            }
            state.link = None;
            tracing::warn!("serial link lost: {reason}");
            state.status.mark_disconnected(Some(reason));
        });
    }

    // ─── Disconnect ─────────────────────────────────────────────────

    /// Close the port and turn auto-connect off. Cancels any attempt in
    /// flight. Succeeds even when nothing is connected.
    pub async fn disconnect(&self) -> Result<String, ArcadeError> {
        let link = self.update(|state| {
            state.status.auto_connect = false;
            state.epoch += 1;
            state.status.mark_disconnected(None);
            state.link.take()
        });
        if let Some(link) = link {
            close_link(link).await;
            tracing::info!("serial device disconnected");
        }
        Ok("Disconnected".to_string())
    }

    // ─── Writes ─────────────────────────────────────────────────────

    /// Write `command` plus a newline. Connects first if needed.
    pub async fn send_command(&self, command: &str) -> Result<String, ArcadeError> {
        let command = command.trim_end_matches(['\r', '\n']);
        if command.trim().is_empty() {
            return Err(ArcadeError::InvalidRequest("Missing command".to_string()));
        }

        let (generation, writer) = match self.current_writer() {
            Some(link) => link,
            None => {
                self.connect(None).await?;
                self.current_writer().ok_or(ArcadeError::NotConnected)?
            }
        };

        match write_line(&*writer, command).await {
            Ok(()) => {
                self.touch(generation);
                Ok(format!("Sent: {command}"))
            }
            Err(e) => {
                let err = ArcadeError::WriteFailed(e.to_string());
                self.update(|state| {
                    if is_current(state, generation) {
                        state.status.error = Some(err.to_string());
                    }
                });
                tracing::warn!("{err}");
                Err(err)
            }
        }
    }

    /// Send `RUN <COMMAND>` for a known module key.
    pub async fn run_module(&self, module_key: &str) -> Result<String, ArcadeError> {
        let line = run_command_line(module_key)
            .ok_or_else(|| ArcadeError::UnknownModule(module_key.to_string()))?;
        self.send_command(&line).await
    }

    fn current_writer(&self) -> Option<(u64, Arc<AsyncMutex<WriteHalf<T::Port>>>)> {
        self.lock()
            .link
            .as_ref()
            .map(|link| (link.generation, Arc::clone(&link.writer)))
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Start the background reconnect loop. The first tick fires at once.
    /// Calling again while running is a no-op.
    pub fn start(&self) {
        let mut task = self
            .shared
            .reconnect_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() || self.shared.shutdown.is_cancelled() {
            return;
        }
        let this = self.clone();
        let token = self.shared.shutdown.clone();
        let period = self
            .shared
            .config
            .reconnect_interval
            .max(MIN_RECONNECT_INTERVAL);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let _ = this.connect_with(None, Trigger::Auto).await;
                    }
                }
            }
            tracing::debug!("serial reconnect loop stopped");
        }));
    }

    /// Stop the reconnect loop and close any open port.
    pub async fn shutdown(&self) {
        self.shared.shutdown.cancel();
        let task = self
            .shared
            .reconnect_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        let link = self.update(|state| {
            state.epoch += 1;
            state.status.mark_disconnected(None);
            state.link.take()
        });
        if let Some(link) = link {
            close_link(link).await;
        }
    }
}

fn is_current<P>(state: &State<P>, generation: u64) -> bool {
    state
        .link
        .as_ref()
        .is_some_and(|link| link.generation == generation)
}

async fn write_line<W>(writer: &AsyncMutex<W>, line: &str) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut framed = String::with_capacity(line.len() + 1);
    framed.push_str(line);
    framed.push('\n');
    let write = async {
        let mut w = writer.lock().await;
        w.write_all(framed.as_bytes()).await?;
        w.flush().await
    };
    match tokio::time::timeout(WRITE_TIMEOUT, write).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "write timed out",
        )),
    }
}

/// Stop the reader and flush; the port closes when the last half drops.
async fn close_link<P: tokio::io::AsyncWrite>(link: Link<P>) {
    link.cancel.cancel();
    let mut writer = link.writer.lock().await;
    let _ = tokio::time::timeout(WRITE_TIMEOUT, writer.flush()).await;
}
