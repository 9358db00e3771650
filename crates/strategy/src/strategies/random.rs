//! Random Trader
//!
//! Baseline noise. With a personality-scaled probability each tick, buys
//! or sells a uniform amount in `[min_trade, max_trade]`.

use banana_core::{Decision, Side};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MarketView;
use crate::personality::Personality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    pub min_trade: f64,
    pub max_trade: f64,
    /// Chance of trading on a given tick
    pub trade_probability: f64,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            min_trade: 0.5,
            max_trade: 3.0,
            trade_probability: 0.3,
        }
    }
}

pub fn decide<R: Rng + ?Sized>(
    config: &RandomConfig,
    _view: &MarketView<'_>,
    personality: Personality,
    rng: &mut R,
) -> Decision {
    let probability = personality.scale(config.trade_probability).min(1.0);
    if rng.r#gen::<f64>() >= probability {
        return Decision::hold();
    }

    let side = if rng.r#gen::<bool>() { Side::Buy } else { Side::Sell };
    let lo = personality.scale(config.min_trade);
    let hi = personality.scale(config.max_trade).max(lo);
    Decision::trade(side, rng.gen_range(lo..=hi))
}
