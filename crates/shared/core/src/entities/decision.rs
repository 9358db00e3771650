use serde::{Deserialize, Serialize};

use super::Side;

/// What a strategy wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// The trade side, or `None` for hold
    pub fn side(&self) -> Option<Side> {
        match self {
            Action::Buy => Some(Side::Buy),
            Action::Sell => Some(Side::Sell),
            Action::Hold => None,
        }
    }
}

impl From<Side> for Action {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Action::Buy,
            Side::Sell => Action::Sell,
        }
    }
}

/// Output of a strategy: an action and a coin amount
///
/// A hold always carries amount 0, and amounts are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub amount: f64,
}

impl Decision {
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            amount: 0.0,
        }
    }

    pub fn buy(amount: f64) -> Self {
        Self::trade(Side::Buy, amount)
    }

    pub fn sell(amount: f64) -> Self {
        Self::trade(Side::Sell, amount)
    }

    /// Builds a trade decision, collapsing non-positive or non-finite amounts to hold
    pub fn trade(side: Side, amount: f64) -> Self {
        if !amount.is_finite() || amount <= 0.0 {
            return Self::hold();
        }
        Self {
            action: side.into(),
            amount,
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.action.side()
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::hold()
    }
}
