//! Configuration management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest base (master) volume the mixer accepts
pub const BASE_VOLUME_LIMIT: f32 = 15.0;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mixer engine settings
    pub mixer: MixerConfig,
    /// Output settings
    pub audio: AudioConfig,
    /// Debug and logging settings
    pub debug: DebugConfig,
}

/// Mixer engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Number of channel slots
    pub num_channels: u32,
    /// Output sample rate in Hz
    pub mix_rate: u32,
    /// Base (master) volume, 0.0 to 15.0
    pub base_volume: f32,
    /// Samples requested per backend pull
    pub period: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            num_channels: 16,
            mix_rate: 44100,
            base_volume: 1.0,
            period: 1024,
        }
    }
}

/// Output backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Discard output
    #[default]
    Null,
    /// System audio device through cpal
    Cpal,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enable: bool,
    pub backend: BackendKind,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enable: true,
            backend: BackendKind::Null,
        }
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Debug and logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_path: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_to_file: false,
            log_path: PathBuf::from("pcmix.log"),
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pcmix").join("config.toml"))
    }

    /// Load the configuration from the default location, falling back to
    /// defaults when no file exists yet
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate the configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration to a specific file, creating parent
    /// directories as needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject values the mixer would refuse at init
    pub fn validate(&self) -> Result<()> {
        let mixer = &self.mixer;
        if mixer.num_channels == 0 {
            return Err(Error::InvalidConfig("mixer.num_channels must be at least 1".into()));
        }
        if mixer.mix_rate == 0 {
            return Err(Error::InvalidConfig("mixer.mix_rate must be nonzero".into()));
        }
        if mixer.period == 0 {
            return Err(Error::InvalidConfig("mixer.period must be nonzero".into()));
        }
        if !(0.0..=BASE_VOLUME_LIMIT).contains(&mixer.base_volume) {
            return Err(Error::InvalidConfig(format!(
                "mixer.base_volume {} outside 0.0..={}",
                mixer.base_volume, BASE_VOLUME_LIMIT
            )));
        }
        Ok(())
    }
}
