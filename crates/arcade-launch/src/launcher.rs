//! Game launcher: validate, place, spawn, watch, restore.
//!
//! `launch` returns as soon as the OS confirms the spawn. Exit is reported
//! later on the [`GameEvent`] channel, after the shell window has been shown
//! again. Every failure after the shell has gone fullscreen re-shows it, so
//! the user is never left without a usable UI.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::broadcast;

use arcade_core::{
    ArcadeError, GameEvent, LaunchMode, LaunchRequest, Rect, compute_target_bounds,
    resolve_game_path,
};

use crate::positioner::WindowPositioner;
use crate::process::GameProcessHandle;
use crate::shell::ShellWindow;

const EVENT_CAPACITY: usize = 64;

/// Interpreter used for `.py` games when none is configured.
pub fn default_python() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

/// How a game file is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    /// Run through the Python interpreter with the placement env contract.
    Python,
    /// Executed directly; no placement contract.
    Native,
}

impl GameKind {
    /// Classify a resolved, existing game file by extension.
    pub async fn detect(path: &Path) -> Result<Self, ArcadeError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("py") => Ok(Self::Python),
            Some("exe") => Ok(Self::Native),
            Some(other) => Err(ArcadeError::UnsupportedFileType(format!(".{other}"))),
            None if is_executable(path).await => Ok(Self::Native),
            None => Err(ArcadeError::UnsupportedFileType("(no extension)".into())),
        }
    }
}

#[cfg(unix)]
async fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
async fn is_executable(_path: &Path) -> bool {
    false
}

/// What a successful launch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub kind: GameKind,
    pub pid: Option<u32>,
    pub target: Rect,
}

impl LaunchOutcome {
    pub fn message(&self) -> &'static str {
        "Game launched successfully"
    }
}

/// Spawns games and tracks them until exit.
pub struct GameLauncher {
    games_dir: PathBuf,
    python: String,
    shell: Arc<dyn ShellWindow>,
    positioner: Arc<dyn WindowPositioner>,
    events: broadcast::Sender<GameEvent>,
}

impl GameLauncher {
    pub fn new(
        games_dir: impl Into<PathBuf>,
        shell: Arc<dyn ShellWindow>,
        positioner: Arc<dyn WindowPositioner>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            games_dir: games_dir.into(),
            python: default_python().to_string(),
            shell,
            positioner,
            events,
        }
    }

    /// Override the interpreter used for `.py` games.
    #[must_use]
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn games_dir(&self) -> &Path {
        &self.games_dir
    }

    /// Receive one [`GameEvent::Exited`] per game process exit.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Toggle the shell window's fullscreen state.
    pub fn set_fullscreen(&self, fullscreen: bool) -> bool {
        self.shell.set_fullscreen(fullscreen)
    }

    /// Launch a game. Suspends until the process is spawned, never until it exits.
    pub async fn launch(&self, request: LaunchRequest) -> Result<LaunchOutcome, ArcadeError> {
        if request.game_path.trim().is_empty() {
            return Err(ArcadeError::InvalidRequest("Missing game path".into()));
        }

        tracing::info!(game = %request.game_path, mode = %request.mode, "launching game");

        let display = self.shell.active_display();
        let host = self.shell.window_bounds().unwrap_or(display);
        let target = compute_target_bounds(request.mode, display, host, request.viewport);

        // Hand off visually before the child paints.
        self.shell.set_bounds(display);
        self.shell.set_fullscreen(true);

        match self.spawn_game(&request, target).await {
            Ok(outcome) => {
                tracing::info!(
                    game = %request.game_path,
                    pid = ?outcome.pid,
                    "game launched at {},{} {}x{}",
                    target.x,
                    target.y,
                    target.width,
                    target.height,
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(game = %request.game_path, kind = e.kind(), "launch failed: {e}");
                self.shell.show();
                Err(e)
            }
        }
    }

    async fn spawn_game(
        &self,
        request: &LaunchRequest,
        target: Rect,
    ) -> Result<LaunchOutcome, ArcadeError> {
        let full_path = resolve_game_path(&self.games_dir, &request.game_path)?;
        tracing::debug!(path = %full_path.display(), "resolved game path");

        if !tokio::fs::try_exists(&full_path).await.unwrap_or(false) {
            return Err(ArcadeError::GameNotFound(request.game_path.clone()));
        }

        let kind = GameKind::detect(&full_path).await?;
        let mut command = match kind {
            GameKind::Python => python_command(&self.python, &full_path, request.mode, target),
            GameKind::Native => native_command(&full_path),
        };

        let child = command
            .spawn()
            .map_err(|e| ArcadeError::LaunchFailed(format!("{}: {e}", program_name(&command))))?;

        let handle = GameProcessHandle::new(request.game_path.clone(), child);
        let pid = handle.id();
        self.watch_exit(handle);

        if kind == GameKind::Python {
            self.positioner.position(target, request.mode);
        }

        Ok(LaunchOutcome { kind, pid, target })
    }

    /// Detach a task that owns the process until exit, then restores the shell.
    fn watch_exit(&self, handle: GameProcessHandle) {
        let shell = Arc::clone(&self.shell);
        let events = self.events.clone();
        tokio::spawn(async move {
            let game_path = handle.game_path().to_string();
            let code = handle.wait_exit().await;
            tracing::info!(game = %game_path, code = ?code, "game process exited");
            shell.show();
            // No subscribers is fine: the shell has already been restored.
            let _ = events.send(GameEvent::Exited { game_path, code });
        });
    }
}

/// Interpreter invocation for a `.py` game, including the placement env contract.
fn python_command(python: &str, script: &Path, mode: LaunchMode, target: Rect) -> Command {
    let mut cmd = Command::new(python);
    cmd.arg(script)
        .env("ARCADE_EMBEDDED", mode.embedded_flag())
        .env("ARCADE_WINDOW_POS", target.position_env())
        .env("ARCADE_WINDOW_SIZE", target.size_env())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = script.parent() {
        cmd.current_dir(dir);
    }
    detach(&mut cmd);
    cmd
}

fn native_command(binary: &Path) -> Command {
    let mut cmd = Command::new(binary);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);
    cmd
}

/// Keep the game out of the shell's process group so terminal signals
/// aimed at the shell do not reach it.
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    cmd.creation_flags(DETACHED_PROCESS);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}

fn program_name(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::sync::Mutex;
    use std::time::Duration;

    use arcade_core::Viewport;

    const DISPLAY: Rect = Rect::new(0, 0, 1920, 1080);

    #[derive(Debug, Clone, PartialEq)]
    enum ShellCall {
        SetBounds(Rect),
        Fullscreen(bool),
        Show,
    }

    struct RecordingShell {
        window: Option<Rect>,
        calls: Mutex<Vec<ShellCall>>,
    }

    impl RecordingShell {
        fn new(window: Option<Rect>) -> Arc<Self> {
            Arc::new(Self {
                window,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<ShellCall> {
            self.calls.lock().expect("lock").clone()
        }

        fn show_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| **c == ShellCall::Show)
                .count()
        }
    }

    impl ShellWindow for RecordingShell {
        fn window_bounds(&self) -> Option<Rect> {
            self.window
        }
        fn active_display(&self) -> Rect {
            DISPLAY
        }
        fn set_bounds(&self, bounds: Rect) {
            self.calls.lock().expect("lock").push(ShellCall::SetBounds(bounds));
        }
        fn set_fullscreen(&self, fullscreen: bool) -> bool {
            self.calls
                .lock()
                .expect("lock")
                .push(ShellCall::Fullscreen(fullscreen));
            self.window.is_some()
        }
        fn show(&self) {
            self.calls.lock().expect("lock").push(ShellCall::Show);
        }
    }

    #[derive(Default)]
    struct RecordingPositioner {
        targets: Mutex<Vec<(Rect, LaunchMode)>>,
    }

    impl WindowPositioner for RecordingPositioner {
        fn position(&self, target: Rect, mode: LaunchMode) {
            self.targets.lock().expect("lock").push((target, mode));
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        shell: Arc<RecordingShell>,
        positioner: Arc<RecordingPositioner>,
        launcher: GameLauncher,
    }

    fn fixture(python: &str) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("games")).expect("mkdir");
        let shell = RecordingShell::new(Some(Rect::new(100, 50, 1200, 800)));
        let positioner = Arc::new(RecordingPositioner::default());
        let launcher = GameLauncher::new(
            dir.path(),
            Arc::clone(&shell) as Arc<dyn ShellWindow>,
            Arc::clone(&positioner) as Arc<dyn WindowPositioner>,
        )
        .with_python(python);
        Fixture {
            dir,
            shell,
            positioner,
            launcher,
        }
    }

    async fn next_exit(rx: &mut broadcast::Receiver<GameEvent>) -> GameEvent {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("exit event in time")
            .expect("channel open")
    }

    #[test]
    fn default_python_per_platform() {
        if cfg!(windows) {
            assert_eq!(default_python(), "python");
        } else {
            assert_eq!(default_python(), "python3");
        }
    }

    #[test]
    fn python_command_sets_env_contract() {
        let cmd = python_command(
            "python3",
            Path::new("/base/games/pong.py"),
            LaunchMode::Embedded,
            Rect::new(110, 70, 640, 480),
        );
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "python3");
        let args: Vec<&OsStr> = std_cmd.get_args().collect();
        assert_eq!(args, [OsStr::new("/base/games/pong.py")]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/base/games")));

        let envs: Vec<(&OsStr, Option<&OsStr>)> = std_cmd.get_envs().collect();
        assert!(envs.contains(&(OsStr::new("ARCADE_EMBEDDED"), Some(OsStr::new("1")))));
        assert!(envs.contains(&(OsStr::new("ARCADE_WINDOW_POS"), Some(OsStr::new("110,70")))));
        assert!(envs.contains(&(
            OsStr::new("ARCADE_WINDOW_SIZE"),
            Some(OsStr::new("640x480"))
        )));
    }

    #[test]
    fn native_command_has_no_env_contract() {
        let cmd = native_command(Path::new("/base/games/game.exe"));
        assert_eq!(cmd.as_std().get_envs().count(), 0);
    }

    #[tokio::test]
    async fn detect_kinds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let py = dir.path().join("a.PY");
        let exe = dir.path().join("b.exe");
        let txt = dir.path().join("c.txt");
        for p in [&py, &exe, &txt] {
            std::fs::write(p, "").expect("write");
        }
        assert_eq!(GameKind::detect(&py).await, Ok(GameKind::Python));
        assert_eq!(GameKind::detect(&exe).await, Ok(GameKind::Native));
        assert_eq!(
            GameKind::detect(&txt).await,
            Err(ArcadeError::UnsupportedFileType(".txt".into()))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn detect_extensionless_requires_exec_bit() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let bin = dir.path().join("runner");
        std::fs::write(&bin, "").expect("write");
        assert!(matches!(
            GameKind::detect(&bin).await,
            Err(ArcadeError::UnsupportedFileType(_))
        ));
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        assert_eq!(GameKind::detect(&bin).await, Ok(GameKind::Native));
    }

    #[tokio::test]
    async fn empty_path_is_rejected_before_touching_shell() {
        let fx = fixture("python3");
        let err = fx
            .launcher
            .launch(LaunchRequest::external("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ArcadeError::InvalidRequest(_)));
        assert!(fx.shell.calls().is_empty());
    }

    #[tokio::test]
    async fn traversal_is_rejected_and_shell_restored() {
        let fx = fixture("python3");
        let err = fx
            .launcher
            .launch(LaunchRequest::external("../../etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArcadeError::PathTraversal(_)));
        assert_eq!(
            fx.shell.calls(),
            [
                ShellCall::SetBounds(DISPLAY),
                ShellCall::Fullscreen(true),
                ShellCall::Show
            ]
        );
    }

    #[tokio::test]
    async fn missing_file_is_game_not_found() {
        let fx = fixture("python3");
        let err = fx
            .launcher
            .launch(LaunchRequest::external("./games/missing.py"))
            .await
            .unwrap_err();
        assert_eq!(err, ArcadeError::GameNotFound("./games/missing.py".into()));
        assert_eq!(fx.shell.show_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let fx = fixture("python3");
        std::fs::write(fx.dir.path().join("games/readme.txt"), "hi").expect("write");
        let err = fx
            .launcher
            .launch(LaunchRequest::external("games/readme.txt"))
            .await
            .unwrap_err();
        assert_eq!(err, ArcadeError::UnsupportedFileType(".txt".into()));
    }

    #[tokio::test]
    async fn spawn_error_restores_shell_without_exit_event() {
        let fx = fixture("/nonexistent/arcade-python");
        std::fs::write(fx.dir.path().join("games/pong.py"), "print('hi')").expect("write");
        let mut rx = fx.launcher.subscribe();

        let err = fx
            .launcher
            .launch(LaunchRequest::external("games/pong.py"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArcadeError::LaunchFailed(_)));
        assert_eq!(fx.shell.show_count(), 1);
        assert!(
            tokio::time::timeout(Duration::from_millis(200), rx.recv())
                .await
                .is_err(),
            "no exit event for a process that never started"
        );
    }

    // `sh` stands in for the interpreter: it runs the `.py` file as a script.
    #[cfg(unix)]
    #[tokio::test]
    async fn exit_restores_shell_exactly_once() {
        for code in [0, 3] {
            let fx = fixture("sh");
            std::fs::write(fx.dir.path().join("games/game.py"), format!("exit {code}\n"))
                .expect("write");
            let mut rx = fx.launcher.subscribe();

            let outcome = fx
                .launcher
                .launch(LaunchRequest::external("games/game.py"))
                .await
                .expect("launch");
            assert_eq!(outcome.kind, GameKind::Python);
            assert_eq!(outcome.target, DISPLAY);

            let event = next_exit(&mut rx).await;
            assert_eq!(
                event,
                GameEvent::Exited {
                    game_path: "games/game.py".into(),
                    code: Some(code),
                }
            );
            assert_eq!(fx.shell.show_count(), 1);
            assert!(
                tokio::time::timeout(Duration::from_millis(200), rx.recv())
                    .await
                    .is_err(),
                "exactly one exit event"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn embedded_launch_passes_placement_env() {
        let fx = fixture("sh");
        std::fs::write(
            fx.dir.path().join("games/env.py"),
            "printf '%s|%s|%s' \"$ARCADE_EMBEDDED\" \"$ARCADE_WINDOW_POS\" \"$ARCADE_WINDOW_SIZE\" > env.txt\n",
        )
        .expect("write");
        let mut rx = fx.launcher.subscribe();

        let request = LaunchRequest::external("./games/env.py").embedded(Viewport {
            x: 10.0,
            y: 20.0,
            width: 640.0,
            height: 480.0,
        });
        let outcome = fx.launcher.launch(request).await.expect("launch");
        assert_eq!(outcome.target, Rect::new(110, 70, 640, 480));

        next_exit(&mut rx).await;
        let env = std::fs::read_to_string(fx.dir.path().join("games/env.txt")).expect("env.txt");
        assert_eq!(env, "1|110,70|640x480");

        let targets = fx.positioner.targets.lock().expect("lock").clone();
        assert_eq!(targets, [(Rect::new(110, 70, 640, 480), LaunchMode::Embedded)]);
    }
}
