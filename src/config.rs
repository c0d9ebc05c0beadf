// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Roomsense configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alert::Thresholds;
use crate::analytics::AnalyticsConfig;
use crate::error::ConfigError;
use crate::history::DEFAULT_CAPACITY;
use crate::ingest::DEFAULT_POLL_TIMEOUT;

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsenseConfig {
    /// Bounded history settings.
    pub history: HistoryConfig,

    /// Analytics window sizes.
    pub analytics: AnalyticsConfig,

    /// Initial alert thresholds.
    pub thresholds: Thresholds,

    /// Ingestion loop settings.
    pub ingest: IngestConfig,

    /// Initial security mode (default: off).
    pub security_mode: bool,
}

/// Bounded history configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Samples retained per channel.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Ingestion loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum wait for a line before re-checking for shutdown (ms).
    pub poll_timeout_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
        }
    }
}

impl IngestConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl RoomsenseConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.capacity == 0 {
            return Err(ConfigError::Invalid(
                "history.capacity must be greater than 0".to_string(),
            ));
        }
        if self.analytics.average_window == 0 {
            return Err(ConfigError::Invalid(
                "analytics.average_window must be greater than 0".to_string(),
            ));
        }
        if self.analytics.trend_window == 0 {
            return Err(ConfigError::Invalid(
                "analytics.trend_window must be greater than 0".to_string(),
            ));
        }
        if self.ingest.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "ingest.poll_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if !self.thresholds.is_finite() {
            return Err(ConfigError::Invalid(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RoomsenseConfig::default();
        assert_eq!(config.history.capacity, 50);
        assert_eq!(config.analytics.average_window, 20);
        assert_eq!(config.analytics.trend_window, 5);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.ingest.poll_timeout(), Duration::from_millis(250));
        assert!(!config.security_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = RoomsenseConfig::from_json_str(
            r#"{ "history": { "capacity": 100 }, "security_mode": true }"#,
        )
        .unwrap();
        assert_eq!(config.history.capacity, 100);
        assert!(config.security_mode);
        assert_eq!(config.analytics.trend_window, 5);
    }

    #[test]
    fn test_invalid_capacity() {
        let result = RoomsenseConfig::from_json_str(r#"{ "history": { "capacity": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_json() {
        let result = RoomsenseConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = RoomsenseConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(RoomsenseConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roomsense.json");
        std::fs::write(&path, r#"{ "thresholds": { "temperature": 18.0 } }"#).unwrap();

        let config = RoomsenseConfig::from_json_file(&path).unwrap();
        assert_eq!(config.thresholds.temperature, 18.0);
        assert_eq!(config.thresholds.light, 200.0);
    }
}
