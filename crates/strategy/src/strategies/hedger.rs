//! Volatility Hedger
//!
//! Holds a large coin share in calm markets and de-risks into currency when
//! recent volatility crosses a threshold.

use banana_core::{Decision, stats};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MarketView;
use super::market_maker::{SkipExt, rebalance_toward};
use crate::personality::Personality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgerConfig {
    /// Returns used to measure volatility
    pub volatility_window: usize,
    /// Stddev of returns above which the market counts as volatile
    pub volatility_threshold: f64,
    /// Target coin ratio in calm markets
    pub calm_coin_ratio: f64,
    /// Target coin ratio in volatile markets
    pub volatile_coin_ratio: f64,
    pub rebalance_band: f64,
    pub trade_size: f64,
    pub skip_probability: f64,
}

impl Default for HedgerConfig {
    fn default() -> Self {
        Self {
            volatility_window: 10,
            volatility_threshold: 0.05,
            calm_coin_ratio: 0.7,
            volatile_coin_ratio: 0.3,
            rebalance_band: 0.1,
            trade_size: 2.0,
            skip_probability: 0.04,
        }
    }
}

pub fn decide<R: Rng + ?Sized>(
    config: &HedgerConfig,
    view: &MarketView<'_>,
    personality: Personality,
    rng: &mut R,
) -> Decision {
    let window = personality.scale_window(config.volatility_window, 5);
    if view.history.len() < window + 1 {
        return Decision::hold();
    }

    let returns = stats::simple_returns(stats::trailing(view.history, window + 1));
    let volatility = stats::population_std(&returns);

    let base = if volatility > personality.scale(config.volatility_threshold) {
        config.volatile_coin_ratio
    } else {
        config.calm_coin_ratio
    };
    let target = personality.scale(base).clamp(0.0, 1.0);
    let band = personality.scale(config.rebalance_band);

    rebalance_toward(view, target, band, personality.scale(config.trade_size))
        .filter_skip(config.skip_probability, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_core::{Action, Wallet};
    use rand::rngs::mock::StepRng;

    fn run(history: &[f64], wallet: &Wallet) -> Decision {
        run_as(Personality::NEUTRAL, history, wallet)
    }

    fn run_as(personality: Personality, history: &[f64], wallet: &Wallet) -> Decision {
        let price = *history.last().unwrap();
        decide(
            &HedgerConfig::default(),
            &MarketView::new(history, price, wallet),
            personality,
            &mut StepRng::new(u64::MAX, 0),
        )
    }

    #[test]
    fn test_calm_market_accumulates_coin() {
        let calm = vec![1.0; 15];
        let wallet = Wallet::new("hedge", 100.0, 0.0);
        assert_eq!(run(&calm, &wallet).action, Action::Buy);
    }

    #[test]
    fn test_volatile_market_sheds_coin() {
        let wild: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 1.0 } else { 1.3 }).collect();
        // 65% in coin: inside the calm band, above the volatile band
        let wallet = Wallet::new("hedge", 35.0, 65.0);
        assert_eq!(run(&wild, &wallet).action, Action::Sell);

        let calm = vec![1.0; 15];
        let wallet = Wallet::new("hedge", 35.0, 65.0);
        assert!(run(&calm, &wallet).is_hold());
    }

    #[test]
    fn test_targets_follow_personality() {
        let calm = vec![1.0; 15];
        // 85% in coin: above 0.7 + 0.1, inside 0.84 ± 0.12
        let wallet = Wallet::new("hedge", 15.0, 85.0);
        assert_eq!(run(&calm, &wallet).action, Action::Sell);
        assert!(run_as(Personality::new(1.2), &calm, &wallet).is_hold());
        assert_eq!(
            run_as(Personality::new(0.8), &calm, &wallet).action,
            Action::Sell
        );
    }
}
