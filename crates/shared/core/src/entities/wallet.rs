use serde::{Deserialize, Serialize};

/// Currency and coin balances of a user or an agent
///
/// Both balances stay >= 0. Only the trade executor mutates them during a
/// session; everything else reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// User or agent identifier owning this wallet
    pub owner: String,
    pub currency: f64,
    pub coins: f64,
    /// Tick of the last executed trade, if any
    #[serde(default)]
    pub last_trade_tick: Option<u64>,
}

impl Wallet {
    pub fn new(owner: impl Into<String>, currency: f64, coins: f64) -> Self {
        Self {
            owner: owner.into(),
            currency: currency.max(0.0),
            coins: coins.max(0.0),
            last_trade_tick: None,
        }
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.currency >= cost
    }

    pub fn holds(&self, amount: f64) -> bool {
        self.coins >= amount
    }

    /// Mark-to-market value in currency
    pub fn value_at(&self, price: f64) -> f64 {
        self.currency + self.coins * price
    }

    /// Fraction of the portfolio value held in coin (0 when empty)
    pub fn coin_ratio(&self, price: f64) -> f64 {
        let total = self.value_at(price);
        if total <= 0.0 {
            0.0
        } else {
            self.coins * price / total
        }
    }

    /// Applies signed deltas and clamps both balances at zero
    pub fn apply_delta(&mut self, currency_delta: f64, coin_delta: f64) {
        self.currency = (self.currency + currency_delta).max(0.0);
        self.coins = (self.coins + coin_delta).max(0.0);
    }
}
