//! Configuration management for playctl
//!
//! This module handles loading and managing configuration from config
//! files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::renderer::FrameSize;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control surface configuration
    pub control: ControlConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Where queued commands get drained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumerMode {
    /// A dedicated worker thread drains the queue as soon as it is woken
    Dedicated,

    /// The render loop drains the queue from `on_before_rendering`
    RenderLoop,
}

impl std::str::FromStr for ConsumerMode {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dedicated" => Ok(ConsumerMode::Dedicated),
            "render-loop" => Ok(ConsumerMode::RenderLoop),
            other => Err(PlayerError::Config(format!("Unknown consumer mode '{}'", other))),
        }
    }
}

/// Control surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// How the command queue is drained
    pub consumer_mode: ConsumerMode,

    /// Queue a Play right after media is accepted
    pub auto_play: bool,

    /// Frame size passed with Play until the renderer reports its own
    pub default_frame_size: FrameSize,

    /// Initial volume (0.0 - 1.0)
    pub initial_volume: f32,

    /// Initial playback rate
    pub initial_playback_rate: f32,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            consumer_mode: ConsumerMode::Dedicated,
            auto_play: false,
            default_frame_size: FrameSize::new(1920, 1080),
            initial_volume: 1.0,
            initial_playback_rate: 1.0,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/playctl/config.toml on Linux)
    /// 3. User config file (~/.config/playctl/config.toml on Linux)
    /// 4. Environment variables (PLAYCTL_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config = Self::from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config = Self::from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Read a TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        toml::from_str(&contents).config_err("Failed to parse config file")
    }

    /// Save configuration to the given path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(mode) = std::env::var("PLAYCTL_CONSUMER_MODE") {
            self.control.consumer_mode = mode.parse()?;
        }

        if let Ok(auto_play) = std::env::var("PLAYCTL_AUTO_PLAY") {
            self.control.auto_play = auto_play
                .parse()
                .map_err(|_| PlayerError::Config("Invalid PLAYCTL_AUTO_PLAY".to_string()))?;
        }

        if let Ok(volume) = std::env::var("PLAYCTL_VOLUME") {
            self.control.initial_volume = volume
                .parse()
                .map_err(|_| PlayerError::Config("Invalid PLAYCTL_VOLUME".to_string()))?;
        }

        if let Ok(log_level) = std::env::var("PLAYCTL_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let size = self.control.default_frame_size;
        if size.width == 0 || size.height == 0 {
            return Err(PlayerError::Config("Frame size must be non-zero".to_string()));
        }

        if !(0.0..=1.0).contains(&self.control.initial_volume) {
            return Err(PlayerError::Config("Volume must be between 0.0 and 1.0".to_string()));
        }

        if !(0.25..=4.0).contains(&self.control.initial_playback_rate) {
            return Err(PlayerError::Config(
                "Playback rate must be between 0.25 and 4.0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/playctl/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("playctl").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/playctl/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("playctl").join("config.toml"))
    }
}
