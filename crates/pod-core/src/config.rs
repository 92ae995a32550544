//! Pipeline tuning, loadable from TOML.
//!
//! Every field has a default, so a config file only needs to name the
//! values it overrides:
//!
//! ```toml
//! [gesture]
//! first_release_timeout = 10
//!
//! [control]
//! near_threshold = 60.0
//! far_threshold = 80.0
//! ```

use crate::control::ControlConfig;
use crate::distance::DistanceConfig;
use crate::filter::FilterError;
use crate::gesture::GestureConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("bad config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("filter: {0}")]
    Filter(#[from] FilterError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Process/measurement noise pairs for each smoothed channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub cursor_process_noise: f32,
    pub cursor_measurement_noise: f32,
    pub distance_process_noise: f32,
    pub distance_measurement_noise: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cursor_process_noise: 1.0,
            cursor_measurement_noise: 6.0,
            distance_process_noise: 1.0,
            distance_measurement_noise: 3.0,
        }
    }
}

/// Target screen size in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 2340,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub screen: ScreenConfig,
    pub gesture: GestureConfig,
    pub distance: DistanceConfig,
    pub control: ControlConfig,
}

impl PipelineConfig {
    /// Parse a TOML document; missing sections and fields take defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&src)
    }

    /// Check cross-field invariants. Filter noise is checked when the
    /// filters are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.gesture;
        if g.release_threshold >= g.bend_threshold {
            return Err(ConfigError::Invalid(format!(
                "gesture release_threshold ({}) must be below bend_threshold ({})",
                g.release_threshold, g.bend_threshold
            )));
        }
        if !(g.pinch_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "gesture pinch_threshold must be positive".into(),
            ));
        }
        if g.swipe_min_distance > g.swipe_long_distance {
            return Err(ConfigError::Invalid(
                "gesture swipe_min_distance must not exceed swipe_long_distance".into(),
            ));
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(ConfigError::Invalid("screen size must be non-zero".into()));
        }
        self.control.validate()
    }
}
