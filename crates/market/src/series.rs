//! Append-only price history with derived statistics

use banana_core::stats;
use serde::{Deserialize, Serialize};

use crate::error::MarketError;

/// Trailing window used by [`PriceSeries::volatility`]
pub const VOLATILITY_WINDOW: usize = 10;

/// Historical prices indexed by tick
///
/// Always holds at least the seed price, so `len() == tick() + 1`. Prices
/// are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct PriceSeries {
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(seed_price: f64) -> Self {
        Self {
            prices: vec![seed_price],
        }
    }

    /// Rebuild from persisted prices (seed first)
    pub fn from_prices(prices: Vec<f64>) -> Result<Self, MarketError> {
        if prices.is_empty() {
            return Err(MarketError::EmptySeries);
        }
        Ok(Self { prices })
    }

    /// Append the next tick's price. The caller has already clamped it.
    pub fn append(&mut self, price: f64) {
        self.prices.push(price);
    }

    /// Current tick (0 for the seed price)
    pub fn tick(&self) -> u64 {
        self.prices.len().saturating_sub(1) as u64
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Latest price
    pub fn current(&self) -> f64 {
        self.prices.last().copied().unwrap_or_default()
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Mean of the last `window` prices ending at `as_of` (latest when `None`)
    ///
    /// Averages whatever is available when the history is shorter than the
    /// window, and falls back to the current price when nothing is.
    pub fn moving_average(&self, window: usize, as_of: Option<u64>) -> f64 {
        let end = match as_of {
            Some(tick) => (tick as usize).saturating_add(1).min(self.prices.len()),
            None => self.prices.len(),
        };
        let start = end.saturating_sub(window);
        stats::mean(&self.prices[start..end]).unwrap_or_else(|| self.current())
    }

    /// Population standard deviation of the last `window` prices
    pub fn standard_deviation(&self, window: usize) -> f64 {
        stats::population_std(stats::trailing(&self.prices, window))
    }

    /// Up to `window` simple returns over the trailing prices
    pub fn returns(&self, window: usize) -> Vec<f64> {
        let start = self.prices.len().saturating_sub(window + 1);
        stats::simple_returns(&self.prices[start..])
    }

    /// Raw standard deviation of the last ten returns (not annualised)
    pub fn volatility(&self) -> f64 {
        stats::population_std(&self.returns(VOLATILITY_WINDOW))
    }
}

impl TryFrom<Vec<f64>> for PriceSeries {
    type Error = MarketError;

    fn try_from(prices: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_prices(prices)
    }
}

impl From<PriceSeries> for Vec<f64> {
    fn from(series: PriceSeries) -> Self {
        series.prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::from_prices(prices.to_vec()).unwrap()
    }

    #[test]
    fn test_length_tracks_tick() {
        let mut s = PriceSeries::new(1.0);
        assert_eq!(s.tick(), 0);
        for i in 0..25 {
            s.append(1.0 + i as f64 * 0.01);
            assert_eq!(s.len() as u64, s.tick() + 1);
        }
        assert_eq!(s.tick(), 25);
    }

    #[test]
    fn test_moving_average_of_constant_series() {
        let s = series(&[2.5; 30]);
        for window in [0, 1, 5, 30, 100] {
            assert_eq!(s.moving_average(window, None), 2.5, "window {}", window);
        }
        assert_eq!(s.standard_deviation(10), 0.0);
        assert_eq!(s.standard_deviation(30), 0.0);
    }

    #[test]
    fn test_moving_average_as_of_tick() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(s.moving_average(2, None), 4.5);
        assert_relative_eq!(s.moving_average(2, Some(1)), 1.5);
        // shorter history than window: average what exists
        assert_relative_eq!(s.moving_average(10, Some(2)), 2.0);
        // past the end clamps to latest
        assert_relative_eq!(s.moving_average(1, Some(99)), 5.0);
    }

    #[test]
    fn test_returns_window() {
        let s = series(&[1.0, 2.0, 1.0, 1.5]);
        let r = s.returns(2);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], -0.5);
        assert_relative_eq!(r[1], 0.5);
        assert_eq!(s.returns(50).len(), 3);
    }

    #[test]
    fn test_volatility_needs_two_returns() {
        assert_eq!(PriceSeries::new(1.0).volatility(), 0.0);
        assert_eq!(series(&[1.0, 1.1]).volatility(), 0.0);
        assert!(series(&[1.0, 1.1, 1.0, 1.2]).volatility() > 0.0);
    }

    #[test]
    fn test_only_last_ten_returns_count() {
        let mut prices = vec![1.0, 5.0, 1.0, 5.0];
        prices.extend(std::iter::repeat_n(2.0, 11));
        assert_eq!(series(&prices).volatility(), 0.0);
    }

    #[test]
    fn test_serde_rejects_empty_series() {
        let s = series(&[1.0, 1.25]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[1.0,1.25]");
        assert_eq!(serde_json::from_str::<PriceSeries>(&json).unwrap(), s);
        assert!(serde_json::from_str::<PriceSeries>("[]").is_err());
    }
}
