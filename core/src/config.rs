//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for runtime settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::KeyboardMapping;

/// Runtime configuration.
///
/// Every section and field has a serde default, so a partial file only
/// overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Save slots and autosave
    #[serde(default)]
    pub saves: SavesConfig,
    /// Cheat tables and the cheat monitor
    #[serde(default)]
    pub cheats: CheatsConfig,
    /// Controller and audio sink tracking
    #[serde(default)]
    pub devices: DevicesConfig,
    /// Keyboard bindings
    #[serde(default)]
    pub input: InputConfig,
    /// Window and frame pacing
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavesConfig {
    /// Directory for slot files and indexes (default: `{data_dir}/saves`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Seconds between autosaves (default: 30)
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,
    /// Seconds to wait after a failed autosave (default: 10)
    #[serde(default = "default_autosave_backoff")]
    pub autosave_backoff_secs: u64,
    /// Number of slots per title (default: 10)
    #[serde(default = "default_max_slots")]
    pub max_slots: u32,
    /// Restore slot 0 when a title loads (default: true)
    #[serde(default = "default_true")]
    pub auto_load: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheatsConfig {
    /// Directory for per-title cheat tables (default: `{data_dir}/cheats`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Milliseconds between patch re-applications (default: 1000)
    #[serde(default = "default_cheat_interval")]
    pub monitor_interval_ms: u64,
    /// Seconds to wait after a failed monitor tick (default: 5)
    #[serde(default = "default_cheat_backoff")]
    pub monitor_backoff_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Seconds between controller re-scans (default: 5)
    #[serde(default = "default_device_interval")]
    pub monitor_interval_secs: u64,
    /// Seconds to wait after a failed scan (default: 10)
    #[serde(default = "default_device_backoff")]
    pub scan_backoff_secs: u64,
    /// Stick deadzone (default: 0.3, range: 0.0-1.0)
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,
    /// Which connected controller drives the player (default: 0)
    #[serde(default)]
    pub active_controller: usize,
    /// Enable gamepad support (default: true)
    #[serde(default = "default_true")]
    pub gamepad: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InputConfig {
    #[serde(default)]
    pub keyboard: KeyboardMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Integer window scale (default: 3, range: 1-6)
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// Fixed tick rate in Hz (default: 60)
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
}

fn default_true() -> bool {
    true
}
fn default_autosave_interval() -> u64 {
    30
}
fn default_autosave_backoff() -> u64 {
    10
}
fn default_max_slots() -> u32 {
    10
}
fn default_cheat_interval() -> u64 {
    1000
}
fn default_cheat_backoff() -> u64 {
    5
}
fn default_device_interval() -> u64 {
    5
}
fn default_device_backoff() -> u64 {
    10
}
fn default_deadzone() -> f32 {
    0.3
}
fn default_scale() -> u32 {
    3
}
fn default_tick_rate() -> u32 {
    60
}

impl Default for SavesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            autosave_interval_secs: default_autosave_interval(),
            autosave_backoff_secs: default_autosave_backoff(),
            max_slots: default_max_slots(),
            auto_load: default_true(),
        }
    }
}

impl Default for CheatsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            monitor_interval_ms: default_cheat_interval(),
            monitor_backoff_secs: default_cheat_backoff(),
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: default_device_interval(),
            scan_backoff_secs: default_device_backoff(),
            deadzone: default_deadzone(),
            active_controller: 0,
            gamepad: default_true(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            tick_rate: default_tick_rate(),
        }
    }
}

impl SavesConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn autosave_backoff(&self) -> Duration {
        Duration::from_secs(self.autosave_backoff_secs)
    }

    /// Configured directory, or `{data_dir}/saves`, or `./saves`.
    pub fn resolved_dir(&self) -> PathBuf {
        resolve_dir(self.dir.as_deref(), "saves")
    }
}

impl CheatsConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn monitor_backoff(&self) -> Duration {
        Duration::from_secs(self.monitor_backoff_secs)
    }

    /// Configured directory, or `{data_dir}/cheats`, or `./cheats`.
    pub fn resolved_dir(&self) -> PathBuf {
        resolve_dir(self.dir.as_deref(), "cheats")
    }
}

impl DevicesConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn scan_backoff(&self) -> Duration {
        Duration::from_secs(self.scan_backoff_secs)
    }
}

fn resolve_dir(explicit: Option<&Path>, leaf: &str) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => data_dir()
            .map(|dir| dir.join(leaf))
            .unwrap_or_else(|| PathBuf::from(leaf)),
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Retroplay\config`
/// On macOS: `~/Library/Application Support/io.retroplay.Retroplay`
/// On Linux: `~/.config/retroplay`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "retroplay", "Retroplay")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory (saves and cheat tables).
///
/// Returns `None` if the home directory cannot be determined.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "retroplay", "Retroplay")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    match config_dir() {
        Some(dir) => load_from(&dir.join("config.toml")),
        None => Config::default(),
    }
}

/// Loads the configuration from an explicit path.
///
/// A missing file yields defaults silently; an unparseable one yields
/// defaults with a warning.
pub fn load_from(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring unparseable config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Saves the configuration to the platform config directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &Config) -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        save_to(config, &dir.join("config.toml"))?;
    }
    Ok(())
}

/// Saves the configuration to an explicit path, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, content)
}
