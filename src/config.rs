//! Configuration file support for the simulation driver.
//!
//! Driver options can be loaded from YAML or JSON documents:
//!
//! ```yaml
//! duration:
//!   multiplier: 1000
//!   scale: 0
//!
//! scheduler: calendar
//! run_validations: true
//!
//! virtual_time:
//!   multiplier: 0
//!   scale: 0
//! ```
//!
//! Scales are base-1000 exponents (`-1` is milli, `1` is kilo).

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::duration::Duration;
use crate::event_set::SchedulerKind;
use crate::scale::Scale;
use crate::simulation::SimulationOptions;
use crate::time_point::TimePoint;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A duration expressed as multiplier and scale.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DurationConfig {
    /// Quanta count.
    pub multiplier: i64,

    /// Base-1000 exponent of one quantum.
    #[serde(default)]
    pub scale: Scale,
}

impl DurationConfig {
    /// The configured duration.
    pub fn to_duration(self) -> Duration {
        Duration::new(self.multiplier, self.scale)
    }

    /// The configured instant.
    pub fn to_time_point(self) -> TimePoint {
        TimePoint::new(self.multiplier, self.scale)
    }
}

/// Driver options as a loadable document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum simulated duration; absent means unbounded.
    #[serde(default)]
    pub duration: Option<DurationConfig>,

    /// Event-set backend.
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Whether to validate the model graph before the run.
    #[serde(default = "default_run_validations")]
    pub run_validations: bool,

    /// Simulation time the run starts at; absent means the origin.
    #[serde(default)]
    pub virtual_time: Option<DurationConfig>,
}

fn default_run_validations() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            duration: None,
            scheduler: SchedulerKind::default(),
            run_validations: default_run_validations(),
            virtual_time: None,
        }
    }
}

impl SimulationConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimulationConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting the format from
    /// the extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Converts to a YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to a JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the configured values for consistency.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(duration) = &self.duration {
            if duration.multiplier < 0 {
                return Err(ConfigError::Validation(format!(
                    "duration multiplier must be non-negative, got {}",
                    duration.multiplier
                )));
            }
        }
        if let Some(virtual_time) = &self.virtual_time {
            if virtual_time.multiplier < 0 {
                return Err(ConfigError::Validation(format!(
                    "virtual time multiplier must be non-negative, got {}",
                    virtual_time.multiplier
                )));
            }
        }
        Ok(())
    }

    /// The driver options this configuration describes.
    pub fn options(&self) -> SimulationOptions {
        SimulationOptions {
            duration: self
                .duration
                .map(DurationConfig::to_duration)
                .unwrap_or(Duration::INFINITY),
            default_scheduler: self.scheduler,
            run_validations: self.run_validations,
            virtual_time: self
                .virtual_time
                .map(DurationConfig::to_time_point)
                .unwrap_or_else(TimePoint::origin),
        }
    }
}
