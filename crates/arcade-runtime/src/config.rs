//! Runtime configuration: TOML file with defaults, overridden by CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use arcade_core::Rect;
use arcade_serial::SupervisorConfig;

use crate::cli::ServeOpts;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Base directory for game paths. Current directory when unset.
    pub games_dir: Option<PathBuf>,
    /// Interpreter for `.py` games. Platform default when unset.
    pub python: Option<String>,
    pub display: DisplayConfig,
    pub serial: SerialConfig,
    pub positioner: PositionerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub reconnect_interval_ms: u64,
    pub auto_connect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositionerConfig {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            reconnect_interval_ms: 3000,
            auto_connect: true,
        }
    }
}

impl Default for PositionerConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval_ms: 500,
        }
    }
}

impl RuntimeConfig {
    /// Load from `explicit` (must exist), else the default location if it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        if config.serial.reconnect_interval_ms == 0 {
            anyhow::bail!(
                "invalid config {}: serial.reconnect_interval_ms must be greater than 0",
                path.display()
            );
        }
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `serve` flags on top of file values.
    pub fn apply(&mut self, opts: &ServeOpts) {
        if let Some(dir) = &opts.games_dir {
            self.games_dir = Some(dir.clone());
        }
        if let Some(python) = &opts.python {
            self.python = Some(python.clone());
        }
        if let Some(display) = opts.display {
            self.display = DisplayConfig {
                x: display.x,
                y: display.y,
                width: display.width,
                height: display.height,
            };
        }
        if let Some(baud) = opts.baud_rate {
            self.serial.baud_rate = baud;
        }
        if opts.no_auto_connect {
            self.serial.auto_connect = false;
        }
    }

    pub fn games_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.games_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }

    pub fn display_rect(&self) -> Rect {
        Rect::new(
            self.display.x,
            self.display.y,
            self.display.width,
            self.display.height,
        )
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            baud_rate: self.serial.baud_rate,
            reconnect_interval: Duration::from_millis(self.serial.reconnect_interval_ms),
            auto_connect: self.serial.auto_connect,
        }
    }

    pub fn positioner_interval(&self) -> Duration {
        Duration::from_millis(self.positioner.interval_ms)
    }
}

/// `$XDG_CONFIG_HOME/arcade/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("arcade").join("config.toml"))
}
