//! Configuration for the analytics engine and CLI.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::correlation::{validate_window_minutes, DEFAULT_WINDOW_MINUTES};

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timezone used for day boundaries, week starts and hours of day
    #[serde(with = "tz_serde")]
    pub timezone: Tz,

    /// Number of day/week buckets in usage reports
    pub period_count: usize,

    /// Length of the observation window for histograms and correlation (days)
    pub lookback_days: u32,

    /// Width of co-occurrence slices (minutes)
    pub correlation_window_minutes: u32,

    /// How many correlation pairs to keep in reports
    pub top_correlations: usize,

    /// Pairs at or below this probability are dropped from reports
    pub min_link_probability: f64,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            period_count: 7,
            lookback_days: 30,
            correlation_window_minutes: DEFAULT_WINDOW_MINUTES,
            top_correlations: 5,
            min_link_probability: 0.1,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(io_err)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smarthome-analytics")
            .join("config.json")
    }

    /// Reject values the engine would refuse at call time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_count == 0 {
            return Err(ConfigError::Invalid("period_count must be at least 1".into()));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be at least 1".into()));
        }
        if self.top_correlations == 0 {
            return Err(ConfigError::Invalid("top_correlations must be at least 1".into()));
        }
        validate_window_minutes(self.correlation_window_minutes)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(0.0..=1.0).contains(&self.min_link_probability) {
            return Err(ConfigError::Invalid(format!(
                "min_link_probability must be within 0..=1, got {}",
                self.min_link_probability
            )));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Unknown timezone: {0}")]
    Timezone(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parse an IANA timezone name such as `Asia/Shanghai`.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::Timezone(name.to_string()))
}

/// Serde support for Tz as its IANA name.
mod tz_serde {
    use chrono_tz::Tz;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse::<Tz>()
            .map_err(|_| D::Error::custom(format!("unknown timezone {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.period_count, 7);
        assert_eq!(config.correlation_window_minutes, 30);
        assert_eq!(config.top_correlations, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            timezone: chrono_tz::Asia::Shanghai,
            period_count: 4,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Asia/Shanghai\""));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timezone": "Europe/Paris"}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timezone, chrono_tz::Europe::Paris);
        assert_eq!(loaded.lookback_days, 30);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timezone": "Mars/Olympus"}"#).unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(ConfigError::Timezone(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            correlation_window_minutes: 45,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            min_link_probability: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            period_count: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
