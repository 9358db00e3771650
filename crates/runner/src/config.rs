//! Session configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid config and
//! partial files only override what they name.

use banana_market::MarketConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Settings for one game session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Price, reserves, synthetic flow and shock settings
    pub market: MarketConfig,
    /// Hard upper bound on the number of ticks
    pub duration_ticks: u64,
    /// Wall-clock period between ticks
    pub tick_interval_ms: u64,
    /// Seed for the market and agent ordering; entropy when absent
    pub seed: Option<u64>,
    /// Per-attempt timeout for a snapshot write
    pub persist_timeout_ms: u64,
    /// Extra attempts after a failed snapshot write
    pub persist_retries: u32,
    /// Share of a bot's purchase price given to it as starting currency
    pub bot_funding_fraction: f64,
    pub starting_user_currency: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            duration_ticks: 300,
            tick_interval_ms: 1_000,
            seed: None,
            persist_timeout_ms: 500,
            persist_retries: 2,
            bot_funding_fraction: 0.2,
            starting_user_currency: 1_000.0,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_ticks == 0 {
            return Err(ConfigError::Invalid("duration_ticks must be > 0".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.bot_funding_fraction) {
            return Err(ConfigError::Invalid(format!(
                "bot_funding_fraction must be in [0, 1], got {}",
                self.bot_funding_fraction
            )));
        }
        if !self.starting_user_currency.is_finite() || self.starting_user_currency < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "starting_user_currency must be >= 0, got {}",
                self.starting_user_currency
            )));
        }
        self.market
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_market::PriceDriver;

    #[test]
    fn test_parse_minimal_config() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.duration_ticks, 300);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.market.initial_price, 1.0);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = SessionConfig::from_json(
            r#"{
                "duration_ticks": 60,
                "seed": 42,
                "market": { "initial_price": 2.5, "driver": "agents_only" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.duration_ticks, 60);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.market.initial_price, 2.5);
        assert_eq!(config.market.driver, PriceDriver::AgentsOnly);
        assert_eq!(config.market.initial_coin_reserve, 1_000_000.0);
        assert_eq!(config.persist_retries, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SessionConfig::from_json(r#"{"duration_ticks": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{"bot_funding_fraction": 1.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SessionConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
