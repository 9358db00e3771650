//! Momentum Trader
//!
//! Bets on trend continuation.
//!
//! Strategy:
//! - Compare a short and a long trailing moving average
//! - Short above long by more than the threshold: buy
//! - Short below long by more than the threshold: sell

use banana_core::{Decision, Side, stats};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MarketView;
use crate::personality::Personality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Short moving-average window (ticks)
    pub short_window: usize,
    /// Long moving-average window (ticks)
    pub long_window: usize,
    /// Relative MA gap that triggers a trade
    pub threshold: f64,
    pub trade_size: f64,
    /// Multiplier on trade size
    pub aggressiveness: f64,
    /// Chance to sit out a signal
    pub skip_probability: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 20,
            threshold: 0.02, // 2% MA gap
            trade_size: 2.0,
            aggressiveness: 1.0,
            skip_probability: 0.05,
        }
    }
}

pub fn decide<R: Rng + ?Sized>(
    config: &MomentumConfig,
    view: &MarketView<'_>,
    personality: Personality,
    rng: &mut R,
) -> Decision {
    let short_window = personality.scale_window(config.short_window, 2);
    let long_window = personality
        .scale_window(config.long_window, 2)
        .max(short_window + 1);

    if view.history.len() < long_window {
        return Decision::hold();
    }

    let (Some(short_ma), Some(long_ma)) = (
        stats::mean(stats::trailing(view.history, short_window)),
        stats::mean(stats::trailing(view.history, long_window)),
    ) else {
        return Decision::hold();
    };

    let threshold = personality.scale(config.threshold);
    let side = if short_ma > long_ma * (1.0 + threshold) {
        Side::Buy
    } else if short_ma < long_ma * (1.0 - threshold) {
        Side::Sell
    } else {
        return Decision::hold();
    };

    if rng.r#gen::<f64>() < config.skip_probability {
        return Decision::hold();
    }

    let amount = personality.scale(config.trade_size * config.aggressiveness);
    Decision::trade(side, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_core::{Action, Wallet};
    use rand::rngs::mock::StepRng;

    fn never_skip() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn test_rising_history_buys() {
        let history: Vec<f64> = (0..20).map(|i| 1.0 + i as f64 * 0.1).collect();
        let wallet = Wallet::new("bot", 1_000.0, 0.0);
        let view = MarketView::new(&history, 2.9, &wallet);

        let short = stats::mean(stats::trailing(&history, 5)).unwrap();
        let long = stats::mean(&history).unwrap();
        assert!(short > long * 1.03);

        let d = decide(
            &MomentumConfig::default(),
            &view,
            Personality::NEUTRAL,
            &mut never_skip(),
        );
        assert_eq!(d.action, Action::Buy);
        assert!(d.amount > 0.0);
    }

    #[test]
    fn test_falling_history_sells() {
        let history: Vec<f64> = (0..25).map(|i| 3.0 - i as f64 * 0.1).collect();
        let wallet = Wallet::new("bot", 0.0, 10.0);
        let view = MarketView::new(&history, 0.6, &wallet);
        let d = decide(
            &MomentumConfig::default(),
            &view,
            Personality::new(0.9),
            &mut never_skip(),
        );
        assert_eq!(d.action, Action::Sell);
        assert!((d.amount - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_short_history_holds() {
        let history = [1.0, 1.5, 2.0];
        let wallet = Wallet::new("bot", 1_000.0, 0.0);
        let view = MarketView::new(&history, 2.0, &wallet);
        let d = decide(
            &MomentumConfig::default(),
            &view,
            Personality::NEUTRAL,
            &mut never_skip(),
        );
        assert!(d.is_hold());
    }

    #[test]
    fn test_low_draw_skips_signal() {
        let history: Vec<f64> = (0..20).map(|i| 1.0 + i as f64 * 0.1).collect();
        let wallet = Wallet::new("bot", 1_000.0, 0.0);
        let view = MarketView::new(&history, 2.9, &wallet);
        let d = decide(
            &MomentumConfig::default(),
            &view,
            Personality::NEUTRAL,
            &mut StepRng::new(0, 0),
        );
        assert!(d.is_hold());
    }
}
