//! Market Maker (rebalancer)
//!
//! Keeps the coin share of its own portfolio near a target ratio. This is
//! inventory rebalancing against the pool, not order-book quoting.

use banana_core::{Decision, Side};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MarketView;
use crate::personality::Personality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketMakerConfig {
    /// Desired coin value / total value
    pub target_coin_ratio: f64,
    /// Tolerated drift around the target before trading
    pub rebalance_band: f64,
    pub trade_size: f64,
    pub skip_probability: f64,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            target_coin_ratio: 0.5,
            rebalance_band: 0.1,
            trade_size: 1.5,
            skip_probability: 0.05,
        }
    }
}

pub fn decide<R: Rng + ?Sized>(
    config: &MarketMakerConfig,
    view: &MarketView<'_>,
    personality: Personality,
    rng: &mut R,
) -> Decision {
    let target = personality.scale(config.target_coin_ratio).clamp(0.0, 1.0);
    let band = personality.scale(config.rebalance_band);
    rebalance_toward(view, target, band, personality.scale(config.trade_size))
        .filter_skip(config.skip_probability, rng)
}

/// Trade toward a target coin ratio, holding inside `target ± band`
pub(crate) fn rebalance_toward(
    view: &MarketView<'_>,
    target: f64,
    band: f64,
    trade_size: f64,
) -> Decision {
    if view.wallet.value_at(view.price) <= 0.0 {
        return Decision::hold();
    }
    let ratio = view.wallet.coin_ratio(view.price);
    if ratio < target - band {
        Decision::trade(Side::Buy, trade_size)
    } else if ratio > target + band {
        Decision::trade(Side::Sell, trade_size)
    } else {
        Decision::hold()
    }
}

/// Occasional silent hold applied on top of a fired signal
pub(crate) trait SkipExt {
    fn filter_skip<R: Rng + ?Sized>(self, probability: f64, rng: &mut R) -> Decision;
}

impl SkipExt for Decision {
    fn filter_skip<R: Rng + ?Sized>(self, probability: f64, rng: &mut R) -> Decision {
        if !self.is_hold() && rng.r#gen::<f64>() < probability {
            Decision::hold()
        } else {
            self
        }
    }
}
