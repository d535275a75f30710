//! # Game Configuration
//!
//! Every tuning constant of the tracking pipeline, grouped by concern.
//!
//! ## Usage
//! ```rust
//! use pong_core::config::GameConfig;
//!
//! let config = GameConfig::default();
//! assert_eq!(config.session.max_throws, 6);
//! ```
//!
//! ## Environment Variables
//!
//! - `PONG_CONFIG`: path to a `.json`, `.yaml` or `.yml` file read by
//!   [`GameConfig::from_env_or_default`]

mod pose_config;
mod region_config;
mod session_config;
mod setup_config;
mod tracking_config;

pub use pose_config::PoseConfig;
pub use region_config::RegionLayout;
pub use session_config::SessionConfig;
pub use setup_config::SetupConfig;
pub use tracking_config::TrackingConfig;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::geometry::Size;

pub const CONFIG_ENV_VAR: &str = "PONG_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GameConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub regions: RegionLayout,
    #[serde(default)]
    pub setup: SetupConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl GameConfig {
    pub fn with_view_size(mut self, width: f64, height: f64) -> Self {
        self.session.view_size = Size::new(width, height);
        self
    }

    /// Load and validate a config file. The format follows the extension.
    pub fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let config = Self::parse(path)?;
        config.validate()?;
        info!(path = %path.display(), "loaded game config");
        Ok(config)
    }

    fn parse(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
        let config: GameConfig = match ext.as_deref() {
            Some("json") => serde_json::from_str(&text)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat { path: path.display().to_string() })
            }
        };
        Ok(config)
    }

    /// Load from `PONG_CONFIG` or use defaults.
    pub fn from_env_or_default() -> Self {
        let Ok(path) = env::var(CONFIG_ENV_VAR) else {
            return Self::default();
        };
        match Self::from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(%path, error = %err, "falling back to default game config");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason: format!("{value} is outside [0, 1]") })
            }
        }
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason: format!("{value} must be positive") })
            }
        }
        fn non_zero(field: &'static str, value: usize) -> Result<(), ConfigError> {
            if value > 0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason: "must be greater than zero".into() })
            }
        }

        unit_interval("tracking.min_trajectory_confidence", self.tracking.min_trajectory_confidence)?;
        positive("tracking.max_displacement", self.tracking.max_displacement)?;
        non_zero("tracking.frame_limit", self.tracking.frame_limit as usize)?;

        non_zero("pose.history_capacity", self.pose.history_capacity)?;
        unit_interval("pose.min_body_confidence", self.pose.min_body_confidence)?;
        unit_interval("pose.min_joint_confidence", self.pose.min_joint_confidence)?;

        positive("regions.throw_width", self.regions.throw_width)?;

        unit_interval("setup.min_target_confidence", self.setup.min_target_confidence)?;
        non_zero("setup.stability_history", self.setup.stability_history)?;
        positive("setup.table_length_m", self.setup.table_length_m)?;
        if self.setup.guide_region.is_empty() {
            return Err(ConfigError::Invalid {
                field: "setup.guide_region",
                reason: "guide region has no area".into(),
            });
        }

        non_zero("session.max_throws", self.session.max_throws as usize)?;
        positive("session.view_size.width", self.session.view_size.width)?;
        positive("session.view_size.height", self.session.view_size.height)?;
        positive("session.release_speed_divisor", self.session.release_speed_divisor)?;
        Ok(())
    }
}

// ========== Tests ==========
