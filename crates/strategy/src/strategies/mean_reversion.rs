//! Mean Reversion Trader
//!
//! Bets that stretched prices snap back to their recent mean.
//! Sells when the z-score of the current price is above the threshold,
//! buys when it is below the negative threshold.

use banana_core::{Decision, Side, stats};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MarketView;
use crate::personality::Personality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionConfig {
    /// Trailing window for mean and standard deviation
    pub lookback_window: usize,
    /// Z-score that triggers a trade
    pub std_threshold: f64,
    pub trade_size: f64,
    pub skip_probability: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            lookback_window: 20,
            std_threshold: 1.5,
            trade_size: 2.5,
            skip_probability: 0.03,
        }
    }
}

pub fn decide<R: Rng + ?Sized>(
    config: &MeanReversionConfig,
    view: &MarketView<'_>,
    personality: Personality,
    rng: &mut R,
) -> Decision {
    let lookback = personality.scale_window(config.lookback_window, 5);
    if view.history.len() < lookback {
        return Decision::hold();
    }

    let window = stats::trailing(view.history, lookback);
    let Some(mean) = stats::mean(window) else {
        return Decision::hold();
    };
    let std = stats::population_std(window);
    if std <= 0.0 {
        return Decision::hold();
    }

    let z = (view.price - mean) / std;
    let threshold = personality.scale(config.std_threshold);
    let side = if z > threshold {
        Side::Sell
    } else if z < -threshold {
        Side::Buy
    } else {
        return Decision::hold();
    };

    if rng.r#gen::<f64>() < config.skip_probability {
        return Decision::hold();
    }

    Decision::trade(side, personality.scale(config.trade_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_core::{Action, Wallet};
    use rand::rngs::mock::StepRng;

    fn history_with_last(last: f64) -> Vec<f64> {
        let mut h: Vec<f64> = (0..19)
            .map(|i| if i % 2 == 0 { 1.0 } else { 1.02 })
            .collect();
        h.push(last);
        h
    }

    #[test]
    fn test_spike_sells_and_dip_buys() {
        let wallet = Wallet::new("bot", 1_000.0, 50.0);
        let mut rng = StepRng::new(u64::MAX, 0);

        let spike = history_with_last(1.3);
        let d = decide(
            &MeanReversionConfig::default(),
            &MarketView::new(&spike, 1.3, &wallet),
            Personality::NEUTRAL,
            &mut rng,
        );
        assert_eq!(d.action, Action::Sell);
        assert_eq!(d.amount, 2.5);

        let dip = history_with_last(0.7);
        let d = decide(
            &MeanReversionConfig::default(),
            &MarketView::new(&dip, 0.7, &wallet),
            Personality::NEUTRAL,
            &mut rng,
        );
        assert_eq!(d.action, Action::Buy);
    }

    #[test]
    fn test_flat_history_holds() {
        let wallet = Wallet::new("bot", 1_000.0, 50.0);
        let flat = vec![1.0; 30];
        let d = decide(
            &MeanReversionConfig::default(),
            &MarketView::new(&flat, 1.0, &wallet),
            Personality::NEUTRAL,
            &mut StepRng::new(u64::MAX, 0),
        );
        assert!(d.is_hold());
    }
}
