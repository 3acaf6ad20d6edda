//! Configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PLAYBRIDGE_CONFIG`)
//! 3. Per-user config file (`<config_dir>/playbridge/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable config file is never fatal: the compiled
//! defaults are used and `ConfigSource::log` reports the fallback.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLAYBRIDGE_CONFIG";

/// Full TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub player: PlayerConfig,
    pub logging: LoggingConfig,
}

/// `[player]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Start playback as soon as the sound handle is constructed
    pub auto_play: bool,
    /// Namespace for bus and playable topics (`"{prefix}:{name}"`)
    pub event_prefix: String,
    /// Volume in [0, 1] the player starts with
    pub initial_volume: f64,
    /// EventBus channel capacity
    pub bus_capacity: usize,
    pub fade: FadeConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_play: false,
            event_prefix: "player".to_string(),
            initial_volume: 1.0,
            bus_capacity: 100,
            fade: FadeConfig::default(),
        }
    }
}

/// `[player.fade]` section: linear fadeout ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    /// Volume decrease per tick, on the engine's 0-100 scale
    pub step: u8,
    /// Milliseconds between ticks
    pub interval_ms: u64,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            step: 2,
            interval_ms: 10,
        }
    }
}

impl FadeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter level (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values the player cannot honour
    pub fn validate(&self) -> Result<()> {
        let player = &self.player;
        if !(0.0..=1.0).contains(&player.initial_volume) {
            return Err(Error::Config(format!(
                "player.initial_volume must be within [0, 1], got {}",
                player.initial_volume
            )));
        }
        if player.event_prefix.is_empty() {
            return Err(Error::Config("player.event_prefix must not be empty".to_string()));
        }
        if player.bus_capacity == 0 {
            return Err(Error::Config("player.bus_capacity must be > 0".to_string()));
        }
        if player.fade.step == 0 || player.fade.step > 100 {
            return Err(Error::Config(format!(
                "player.fade.step must be within 1..=100, got {}",
                player.fade.step
            )));
        }
        if player.fade.interval_ms == 0 {
            return Err(Error::Config("player.fade.interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no candidate exists; callers then use defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    dirs::config_dir()
        .map(|d| d.join("playbridge").join("config.toml"))
        .filter(|p| p.exists())
}

/// Where the effective configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    /// No config file found
    Defaults,
    /// A config file was named but could not be used; defaults apply
    Fallback { path: PathBuf, error: Error },
}

impl ConfigSource {
    /// Report how the configuration was obtained
    ///
    /// Kept apart from `load_config` so a binary can load the config that
    /// sets up its logging, then report once logging is up.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Defaults => debug!("No config file found, using compiled defaults"),
            ConfigSource::Fallback { path, error } => warn!(
                "Failed to load config from {}: {}. Using defaults.",
                path.display(),
                error
            ),
        }
    }
}

/// Load configuration with graceful degradation
///
/// An explicitly named file (CLI or env) that cannot be loaded falls back
/// to defaults, same as no file at all. Nothing is logged here; see
/// `ConfigSource::log`.
pub fn load_config(cli_arg: Option<&Path>) -> (TomlConfig, ConfigSource) {
    let Some(path) = resolve_config_path(cli_arg) else {
        return (TomlConfig::default(), ConfigSource::Defaults);
    };

    match TomlConfig::from_file(&path) {
        Ok(config) => (config, ConfigSource::File(path)),
        Err(error) => (TomlConfig::default(), ConfigSource::Fallback { path, error }),
    }
}
