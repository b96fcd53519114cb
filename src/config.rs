//! Configuration management for the query DSL
//!
//! This module provides configuration file support with TOML format,
//! environment variable overrides, and sensible defaults.
//!
//! ```toml
//! [pipeline]
//! viewport_width = 512
//! grid_secs = 600
//!
//! [time]
//! default_timezone = "Europe/Berlin"
//!
//! [logging]
//! level = "info"
//! structured = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::time::TimeZoneName;
use crate::types::{DEFAULT_GRID, DEFAULT_VIEWPORT_WIDTH};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Pipeline defaults
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Calendar settings
    #[serde(default)]
    pub time: TimeConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pipeline defaults
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Chart width in pixels, used as the M4 bucket count
    #[serde(default = "default_viewport_width")]
    pub viewport_width: usize,

    /// Default grid divisor in seconds
    #[serde(default = "default_grid_secs")]
    pub grid_secs: i64,
}

/// Calendar settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeConfig {
    /// Zone used when a request does not name one
    #[serde(default)]
    pub default_timezone: TimeZoneName,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "kuba_dsl=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit structured (JSON) log lines
    #[serde(default = "default_true")]
    pub structured: bool,
}

fn default_viewport_width() -> usize { DEFAULT_VIEWPORT_WIDTH }
fn default_grid_secs() -> i64 { DEFAULT_GRID }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            grid_secs: default_grid_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            structured: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Pipeline
        if let Some(width) = lookup("DSL_VIEWPORT_WIDTH") {
            match width.parse() {
                Ok(w) => self.pipeline.viewport_width = w,
                Err(_) => warn!(value = %width, "Ignoring invalid DSL_VIEWPORT_WIDTH"),
            }
        }
        if let Some(grid) = lookup("DSL_GRID_SECS") {
            match grid.parse() {
                Ok(g) => self.pipeline.grid_secs = g,
                Err(_) => warn!(value = %grid, "Ignoring invalid DSL_GRID_SECS"),
            }
        }

        // Time
        if let Some(tz) = lookup("DSL_TZ") {
            match TimeZoneName::new(tz.as_str()) {
                Ok(name) => self.time.default_timezone = name,
                Err(e) => warn!(value = %tz, error = %e, "Ignoring invalid DSL_TZ"),
            }
        }

        // Logging
        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.viewport_width == 0 {
            return Err(Error::Configuration(
                "Viewport width must be > 0".to_string(),
            ));
        }

        if self.pipeline.grid_secs <= 0 {
            return Err(Error::Configuration(
                "Grid divisor must be > 0".to_string(),
            ));
        }

        self.time.default_timezone.parse().map_err(|e| {
            Error::Configuration(format!("Default timezone is not usable: {}", e))
        })?;

        if self.logging.level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }
}
