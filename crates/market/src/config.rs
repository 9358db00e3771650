use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::pool::PoolLimits;
use crate::shock::ShockConfig;

/// What moves the reserves between agent trades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDriver {
    /// Synthetic random flow every tick; agent and user trades hit the same
    /// pool afterwards
    #[default]
    SyntheticFlow,
    /// No synthetic flow: only agent and user trades move the price
    AgentsOnly,
}

/// Synthetic order flow density and sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub trades_per_tick: u32,
    /// Smallest trade as a fraction of the coin reserve
    pub min_size_fraction: f64,
    /// Largest trade as a fraction of the coin reserve
    pub max_size_fraction: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            trades_per_tick: 20,
            min_size_fraction: 0.003,
            max_size_fraction: 0.015,
        }
    }
}

/// Market parameters for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Seed price (tick 0)
    pub initial_price: f64,
    pub initial_currency_reserve: f64,
    pub initial_coin_reserve: f64,
    pub limits: PoolLimits,
    pub flow: FlowConfig,
    pub driver: PriceDriver,
    pub shock: ShockConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            initial_price: 1.0,
            initial_currency_reserve: 1_000_000.0,
            initial_coin_reserve: 1_000_000.0,
            limits: PoolLimits::default(),
            flow: FlowConfig::default(),
            driver: PriceDriver::default(),
            shock: ShockConfig::default(),
        }
    }
}

/// False for zero, negatives and NaN
fn is_positive(x: f64) -> bool {
    x > 0.0
}

impl MarketConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(MarketError::InvalidConfig(msg.to_string()));

        if !is_positive(self.initial_price) {
            return invalid("initial_price must be positive");
        }
        if !is_positive(self.limits.reserve_floor) {
            return invalid("reserve_floor must be positive");
        }
        if !is_positive(self.limits.price_floor) {
            return invalid("price_floor must be positive");
        }
        if !is_positive(self.flow.min_size_fraction)
            || self.flow.min_size_fraction > self.flow.max_size_fraction
        {
            return invalid("flow size fractions must satisfy 0 < min <= max");
        }
        if self.shock.window_start_pct > self.shock.window_end_pct
            || self.shock.window_end_pct > 100
        {
            return invalid("shock window must satisfy start <= end <= 100");
        }
        if !is_positive(self.shock.min_magnitude)
            || self.shock.min_magnitude > self.shock.max_magnitude
            || self.shock.max_magnitude >= 1.0
        {
            return invalid("shock magnitude must satisfy 0 < min <= max < 1");
        }
        if self.shock.decay_ticks == 0 {
            return invalid("shock decay_ticks must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MarketConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MarketConfig =
            serde_json::from_str(r#"{"initial_price": 2.0, "flow": {"trades_per_tick": 5}}"#)
                .unwrap();
        assert_eq!(config.initial_price, 2.0);
        assert_eq!(config.flow.trades_per_tick, 5);
        assert_eq!(config.flow.max_size_fraction, 0.015);
        assert_eq!(config.driver, PriceDriver::SyntheticFlow);
    }

    #[test]
    fn test_rejects_inverted_shock_window() {
        let config = MarketConfig {
            shock: ShockConfig {
                window_start_pct: 80,
                window_end_pct: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MarketError::InvalidConfig(_))
        ));
    }
}
