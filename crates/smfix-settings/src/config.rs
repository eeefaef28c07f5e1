//! Configuration for SMFix
//!
//! Settings are read from a TOML file. Every key is optional; missing keys
//! take their defaults. Configuration is organized into sections:
//! - `[pipeline]` which passes run and how wide the parallel scans are
//! - `[preheat]` thresholds for the preheat optimizer
//! - `[tower]` prime tower reinforcement
//! - `[header]` fallbacks for the firmware header

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Which passes run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Reduce tool indices modulo 2
    pub remap_tools: bool,
    /// Turn off nozzles that will not be used again
    pub shutoff: bool,
    /// Move preheats earlier and drop duplicate temperature commands
    pub preheat: bool,
    /// Add reinforcement moves on the prime tower
    pub reinforce_tower: bool,
    /// Remove M104 without a target tool inside tool changes
    pub fix_tool_unload: bool,
    /// Parallel scan lanes, 0 for one per hardware thread
    pub workers: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            remap_tools: true,
            shutoff: true,
            preheat: true,
            reinforce_tower: true,
            fix_tool_unload: true,
            workers: 0,
        }
    }
}

/// Preheat thresholds, counted in distinct `M73 R` values walked back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreheatSettings {
    pub short_distance: u32,
    pub long_distance: u32,
    /// Temperature a long-idle nozzle is held at instead of cooling down
    pub deep_freeze_temperature: u32,
}

impl Default for PreheatSettings {
    fn default() -> Self {
        Self {
            short_distance: 1,
            long_distance: 3,
            deep_freeze_temperature: 110,
        }
    }
}

/// Prime tower reinforcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerSettings {
    /// Layers at or below this height are left alone
    pub min_z: f32,
    /// Extrusion of the extra move relative to the original
    pub extrusion_factor: f32,
}

impl Default for TowerSettings {
    fn default() -> Self {
        Self {
            min_z: 0.3,
            extrusion_factor: 0.45,
        }
    }
}

/// Fallbacks for header fields the slicer did not provide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSettings {
    /// Printer model when the G-code does not name one
    pub default_model: String,
    /// IDEX print mode reported in the versioned header
    pub print_mode: String,
    /// Force the header layout (0 legacy, 1 versioned)
    pub force_version: Option<u8>,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            default_model: "Snapmaker J1".to_string(),
            print_mode: "Default".to_string(),
            force_version: None,
        }
    }
}

/// Complete SMFix configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSettings,
    pub preheat: PreheatSettings,
    pub tower: TowerSettings,
    pub header: HeaderSettings,
}

impl Config {
    /// `<config_dir>/smfix/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smfix").join("config.toml"))
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> SettingsResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file that must exist
    pub fn load(path: &Path) -> SettingsResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load the explicit path if given, else the default location, else defaults
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.preheat.short_distance == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "preheat.short_distance".to_string(),
                value: "0".to_string(),
            });
        }
        if self.preheat.short_distance >= self.preheat.long_distance {
            return Err(ConfigError::Inconsistent(format!(
                "preheat.short_distance ({}) must be below preheat.long_distance ({})",
                self.preheat.short_distance, self.preheat.long_distance
            )));
        }
        let factor = self.tower.extrusion_factor;
        if factor.is_nan() || factor <= 0.0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "tower.extrusion_factor".to_string(),
                value: self.tower.extrusion_factor.to_string(),
            });
        }
        if let Some(version) = self.header.force_version {
            if version > 1 {
                return Err(ConfigError::ValueOutOfRange {
                    key: "header.force_version".to_string(),
                    value: version.to_string(),
                });
            }
        }
        Ok(())
    }
}
