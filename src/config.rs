//! Configuration for the motion activity agent.

use crate::collector::SyntheticMotion;
use crate::core::buffer::checked_capacity;
use crate::core::scaling::{
    DynamicScaler, FeatureScaler, ScalingRange, ScalingRangeError, ScalingStrategy, StaticScaler,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Samples per classification window
    pub window_size: usize,

    /// Samples the window advances by between evictions
    pub stride: usize,

    /// Period between classification ticks (milliseconds on disk)
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,

    /// Feature scaling strategy
    pub scaling: ScalingStrategy,

    /// Calibration table for static scaling; the built-in table when unset
    pub scaling_range_path: Option<PathBuf>,

    /// Centroid model file used by `start`
    pub model_path: Option<PathBuf>,

    /// Per-channel sample rate of the synthetic source
    pub synthetic_rate_hz: f64,

    /// Motion pattern of the synthetic source
    pub synthetic_motion: SyntheticMotion,

    /// Path for exporting classification histories
    pub export_path: PathBuf,

    /// Path for storing session statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motion-activity-agent");

        Self {
            window_size: 200,
            stride: 100,
            tick_interval: Duration::from_millis(1000),
            scaling: ScalingStrategy::Static,
            scaling_range_path: None,
            model_path: None,
            synthetic_rate_hz: 100.0,
            synthetic_motion: SyntheticMotion::Walking,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does
    /// not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motion-activity-agent")
            .join("config.json")
    }

    /// Where session statistics persist between runs.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("session_stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be positive".into()));
        }
        if self.stride == 0 {
            return Err(ConfigError::Invalid("stride must be positive".into()));
        }
        checked_capacity(self.window_size, self.stride)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid("tick_interval must be positive".into()));
        }
        if !(self.synthetic_rate_hz.is_finite() && self.synthetic_rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "synthetic_rate_hz must be positive, got {}",
                self.synthetic_rate_hz
            )));
        }
        if self.scaling == ScalingStrategy::Static {
            self.scaling_range()?;
        }
        Ok(())
    }

    /// The calibration table static scaling runs with.
    pub fn scaling_range(&self) -> Result<ScalingRange, ConfigError> {
        match &self.scaling_range_path {
            Some(path) => Ok(ScalingRange::load(path)?),
            None => Ok(ScalingRange::builtin()),
        }
    }

    /// Build the configured scaler.
    pub fn build_scaler(&self) -> Result<Box<dyn FeatureScaler>, ConfigError> {
        Ok(match self.scaling {
            ScalingStrategy::Static => Box::new(StaticScaler::new(self.scaling_range()?)),
            ScalingStrategy::Dynamic => Box::new(DynamicScaler),
        })
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("scaling table: {0}")]
    ScalingRange(#[from] ScalingRangeError),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("motion-config-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_size, 200);
        assert_eq!(config.stride, 100);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.scaling, ScalingStrategy::Static);
        assert!(config.scaling_range_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_interval_serialized_as_millis() {
        let config = Config {
            tick_interval: Duration::from_millis(250),
            ..Config::default()
        };
        let json: serde_json::Value = serde_json::to_value(&config).unwrap();
        assert_eq!(json["tick_interval"], 250);
        assert_eq!(json["scaling"], "static");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"window_size": 50, "scaling": "dynamic"}"#).unwrap();
        assert_eq!(config.window_size, 50);
        assert_eq!(config.stride, 100);
        assert_eq!(config.scaling, ScalingStrategy::Dynamic);
        assert_eq!(config.build_scaler().unwrap().name(), "dynamic");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = temp_dir();
        let path = dir.join("config.json");

        let config = Config {
            window_size: 64,
            stride: 32,
            model_path: Some(PathBuf::from("/models/centroids.json")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let loaded = Config::load_from(&temp_dir().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_validate_rejects_zero_geometry() {
        for config in [
            Config {
                window_size: 0,
                ..Config::default()
            },
            Config {
                stride: 0,
                ..Config::default()
            },
            Config {
                tick_interval: Duration::ZERO,
                ..Config::default()
            },
            Config {
                synthetic_rate_hz: 0.0,
                ..Config::default()
            },
            Config {
                window_size: usize::MAX,
                ..Config::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_static_scaling_table_from_file() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("range.json");
        std::fs::write(&good, r#"{"1": [0.0, 10.0], "2": [-5.0, 5.0]}"#).unwrap();
        let config = Config {
            scaling_range_path: Some(good),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.scaling_range().unwrap().len(), 2);
        assert_eq!(config.build_scaler().unwrap().name(), "static");

        let degenerate = dir.join("degenerate.json");
        std::fs::write(&degenerate, r#"{"1": [3.0, 3.0]}"#).unwrap();
        let config = Config {
            scaling_range_path: Some(degenerate),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScalingRange(
                ScalingRangeError::DegenerateBounds { index: 1, .. }
            ))
        ));

        let missing = Config {
            scaling_range_path: Some(dir.join("missing.json")),
            ..Config::default()
        };
        assert!(missing.validate().is_err());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_dynamic_scaling_ignores_table() {
        let config = Config {
            scaling: ScalingStrategy::Dynamic,
            scaling_range_path: Some(PathBuf::from("/nonexistent/range.json")),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
