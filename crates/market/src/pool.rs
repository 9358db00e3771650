//! Two-reserve liquidity pool quoting `currency / coin`
//!
//! Unlike a full constant-product AMM, trades here execute at the quoted
//! price and simply move reserves; the quote then follows the new ratio.
//! Both reserves are protected by a floor, re-applied after every mutation
//! the market engine performs.

use banana_core::Side;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::FlowConfig;

/// Lower bounds protecting the quote from degenerate reserves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolLimits {
    /// Minimum for both reserves
    pub reserve_floor: f64,
    /// Minimum quoted price
    pub price_floor: f64,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            reserve_floor: 10_000.0,
            price_floor: 0.10,
        }
    }
}

/// Outcome of one burst of synthetic order flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub executed: u32,
    /// Trades skipped because they would have breached a reserve floor
    pub rejected: u32,
}

/// Currency and coin reserves backing the session's price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub currency_reserve: f64,
    pub coin_reserve: f64,
    pub limits: PoolLimits,
}

impl LiquidityPool {
    /// Create a pool; reserves below the floor are raised to it
    pub fn new(currency_reserve: f64, coin_reserve: f64, limits: PoolLimits) -> Self {
        let mut pool = Self {
            currency_reserve,
            coin_reserve,
            limits,
        };
        pool.refloor();
        pool
    }

    /// `max(price_floor, currency / coin)`
    pub fn quote_price(&self) -> f64 {
        if self.coin_reserve <= 0.0 {
            return self.limits.price_floor;
        }
        (self.currency_reserve / self.coin_reserve).max(self.limits.price_floor)
    }

    /// Raise both reserves to the floor (also repairs NaN left by float drift)
    pub fn refloor(&mut self) {
        let floor = self.limits.reserve_floor;
        if self.currency_reserve.is_nan() || self.currency_reserve < floor {
            self.currency_reserve = floor;
        }
        if self.coin_reserve.is_nan() || self.coin_reserve < floor {
            self.coin_reserve = floor;
        }
    }

    /// Apply `n_trades` synthetic trades sized uniformly in the configured
    /// fraction of the coin reserve, each direction with probability 1/2.
    ///
    /// A trade that would push either reserve under the floor is skipped.
    pub fn inject_random_flow<R: Rng + ?Sized>(
        &mut self,
        n_trades: u32,
        flow: &FlowConfig,
        rng: &mut R,
    ) -> FlowSummary {
        let floor = self.limits.reserve_floor;
        let mut summary = FlowSummary::default();

        for _ in 0..n_trades {
            let fraction = rng.gen_range(flow.min_size_fraction..=flow.max_size_fraction);
            let size = self.coin_reserve * fraction;
            let price = self.currency_reserve / self.coin_reserve;

            let (coin, currency) = if rng.r#gen::<bool>() {
                // buy pressure: coin leaves the pool, currency enters
                (self.coin_reserve - size, self.currency_reserve + size * price)
            } else {
                (self.coin_reserve + size, self.currency_reserve - size * price)
            };

            if coin >= floor && currency >= floor {
                self.coin_reserve = coin;
                self.currency_reserve = currency;
                summary.executed += 1;
            } else {
                summary.rejected += 1;
            }
        }

        summary
    }

    /// One-time shock perturbation
    ///
    /// A positive `signed_pct` drains coin and adds half as much currency
    /// (price up); a negative one does the reverse. Reserves are re-floored.
    pub fn apply_shock(&mut self, signed_pct: f64) {
        self.coin_reserve *= 1.0 - signed_pct;
        self.currency_reserve *= 1.0 + signed_pct / 2.0;
        self.refloor();
    }

    /// Pool-side bookkeeping for an executed trade
    ///
    /// A buy removes `amount` coin and adds `amount * price` currency; a sell
    /// is the inverse. Never fails: solvency is checked against the trader's
    /// wallet beforehand and the floor is restored at the end of the tick.
    pub fn apply_trade(&mut self, side: Side, amount: f64, price: f64) {
        let total = amount * price;
        match side {
            Side::Buy => {
                self.coin_reserve -= amount;
                self.currency_reserve += total;
            }
            Side::Sell => {
                self.coin_reserve += amount;
                self.currency_reserve -= total;
            }
        }
    }

    pub fn is_above_floor(&self) -> bool {
        self.currency_reserve >= self.limits.reserve_floor
            && self.coin_reserve >= self.limits.reserve_floor
    }
}
