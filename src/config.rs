//! Configuration management for the analytics engine
//!
//! Loads settings from environment variables (and an optional `.env` file) with validation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default refresh cadence when no ledger notification arrives
const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 15;

/// Default network label reported in the system log
const DEFAULT_NETWORK: &str = "Local/Testnet";

/// Snapshot persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for file-backed snapshots; in-memory storage when `None`
    pub snapshot_dir: Option<PathBuf>,
}

/// Refresh and reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Seconds between poll-driven refreshes
    pub refresh_interval_seconds: u64,

    /// Version string stamped into system reports and snapshots
    pub system_version: String,

    /// Network label stamped into system reports and snapshots
    pub network: String,
}

impl AnalyticsConfig {
    /// Refresh interval as a `Duration`
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

/// Levels accepted by `LOG_LEVEL`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Formats accepted by `LOG_FORMAT`
pub const LOG_FORMATS: [&str; 3] = ["json", "pretty", "text"];

/// Logging configuration, applied by [`crate::init_with_config`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of [`LOG_LEVELS`]
    pub level: String,
    /// One of [`LOG_FORMATS`]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Build a checked logging configuration; names are case-insensitive
    pub fn new(level: &str, format: &str) -> Result<Self> {
        let level = level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::validation(
                "LOG_LEVEL",
                format!("'{level}' is not one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        let format = format.trim().to_ascii_lowercase();
        if !LOG_FORMATS.contains(&format.as_str()) {
            return Err(Error::validation(
                "LOG_FORMAT",
                format!("'{format}' is not one of {}", LOG_FORMATS.join(", ")),
            ));
        }

        Ok(Self { level, format })
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        format!("election_analytics={}", self.level)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let snapshot_dir = std::env::var("ANALYTICS_SNAPSHOT_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let refresh_interval_seconds = parse_refresh_interval(
            std::env::var("ANALYTICS_REFRESH_INTERVAL_SECONDS").ok().as_deref(),
        )?;

        let system_version = std::env::var("ANALYTICS_SYSTEM_VERSION")
            .unwrap_or_else(|_| crate::VERSION.to_string());

        let network =
            std::env::var("ANALYTICS_NETWORK").unwrap_or_else(|_| DEFAULT_NETWORK.to_string());

        let logging = LoggingConfig::new(
            &std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            &std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        )?;

        Ok(Self {
            storage: StorageConfig { snapshot_dir },
            analytics: AnalyticsConfig {
                refresh_interval_seconds,
                system_version,
                network,
            },
            logging,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Result<Self> {
        Ok(Self {
            storage: StorageConfig { snapshot_dir: None },
            analytics: AnalyticsConfig {
                refresh_interval_seconds: 1,
                system_version: crate::VERSION.to_string(),
                network: DEFAULT_NETWORK.to_string(),
            },
            logging: LoggingConfig::new("debug", "pretty")?,
        })
    }
}

fn parse_refresh_interval(raw: Option<&str>) -> Result<u64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_REFRESH_INTERVAL_SECONDS);
    };

    let seconds: u64 = raw.trim().parse().map_err(|_| {
        Error::validation(
            "ANALYTICS_REFRESH_INTERVAL_SECONDS",
            format!("'{raw}' is not a whole number of seconds"),
        )
    })?;

    if seconds == 0 {
        return Err(Error::validation(
            "ANALYTICS_REFRESH_INTERVAL_SECONDS",
            "must be greater than zero",
        ));
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_config_defaults() {
        let config = Config::for_testing().unwrap();
        assert!(config.storage.snapshot_dir.is_none());
        assert_eq!(config.analytics.refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.analytics.network, "Local/Testnet");
    }

    #[test]
    fn test_refresh_interval_parsing() {
        assert_eq!(
            parse_refresh_interval(None).unwrap(),
            DEFAULT_REFRESH_INTERVAL_SECONDS
        );
        assert_eq!(parse_refresh_interval(Some(" 30 ")).unwrap(), 30);
        assert!(parse_refresh_interval(Some("0")).is_err());
        assert!(parse_refresh_interval(Some("soon")).is_err());
    }

    #[test]
    fn test_logging_config_validation() {
        let logging = LoggingConfig::new(" WARN ", "Json").unwrap();
        assert_eq!(logging.level, "warn");
        assert_eq!(logging.format, "json");
        assert_eq!(logging.filter_directive(), "election_analytics=warn");

        match LoggingConfig::new("loud", "json").unwrap_err() {
            Error::Validation { field, .. } => assert_eq!(field, "LOG_LEVEL"),
            other => panic!("unexpected error: {other}"),
        }
        match LoggingConfig::new("info", "xml").unwrap_err() {
            Error::Validation { field, .. } => assert_eq!(field, "LOG_FORMAT"),
            other => panic!("unexpected error: {other}"),
        }

        let testing = Config::for_testing().unwrap();
        assert_eq!(testing.logging.format, "pretty");
        assert_eq!(LoggingConfig::default().format, "text");
    }
}
