//! Cadence configuration file handling

use anyhow::{Context, Result};
use cadence_recorder::{RecorderConfig, ReplayConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE: &str = "cadence.toml";

/// Top-level Cadence configuration (cadence.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub replay: ReplaySection,
    #[serde(default)]
    pub record: RecordSection,
    #[serde(default)]
    pub log: LogSection,
}

/// Playback settings
#[derive(Debug, Deserialize, Serialize)]
pub struct ReplaySection {
    /// Loop until interrupted
    #[serde(default)]
    pub repeat: bool,
    /// Stop after this many passes (overrides `repeat`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passes: Option<u32>,
    /// Playback speed multiplier
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    1.0
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self {
            repeat: false,
            passes: None,
            speed: default_speed(),
        }
    }
}

/// Recording settings
#[derive(Debug, Deserialize, Serialize)]
pub struct RecordSection {
    /// Inputs never captured (the start/stop hotkeys)
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_ignore() -> Vec<String> {
    vec!["Key.f7".to_string(), "Key.f8".to_string()]
}

impl Default for RecordSection {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
        }
    }
}

/// Logging settings
#[derive(Debug, Deserialize, Serialize)]
pub struct LogSection {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl ReplaySection {
    pub fn replay_config(&self) -> ReplayConfig {
        let config = ReplayConfig::default().with_speed(self.speed);
        match self.passes {
            Some(passes) => config.with_passes(passes),
            None => config.with_repeat(self.repeat),
        }
    }
}

impl RecordSection {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig::new().with_ignored(self.ignore.iter().map(String::as_str))
    }
}

impl CadenceConfig {
    /// Resolve a `--config` argument (file or directory) to a file path.
    pub fn resolve_path(path: &Path) -> PathBuf {
        if path.is_dir() {
            path.join(CONFIG_FILE)
        } else {
            path.to_path_buf()
        }
    }

    /// Load configuration from a file or directory.
    ///
    /// An explicitly named file must exist; a missing `cadence.toml` in a
    /// directory falls back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let explicit = !path.is_dir();
        let config_path = Self::resolve_path(path);

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Config file {} does not exist", config_path.display());
            }
            tracing::debug!(dir = %path.display(), "no {CONFIG_FILE}, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: CadenceConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if !config.replay.speed.is_finite() || config.replay.speed <= 0.0 {
            anyhow::bail!(
                "Invalid replay.speed {} in {}",
                config.replay.speed,
                config_path.display()
            );
        }

        if config.replay.passes == Some(0) {
            anyhow::bail!("Invalid replay.passes 0 in {}", config_path.display());
        }

        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
