//! SMFix Settings Crate
//!
//! Handles the TOML configuration file that tunes the pass pipeline and the
//! firmware header.

pub mod config;
pub mod error;

pub use config::{Config, HeaderSettings, PipelineSettings, PreheatSettings, TowerSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
