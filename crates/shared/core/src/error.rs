use thiserror::Error;

/// Why a buy or sell was rejected
///
/// These are expected and frequent. Callers treat them as a no-op for agents
/// and surface the reason to users.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("Insufficient funds: need {required:.4}, have {available:.4}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Insufficient holdings: need {required:.4} coins, have {available:.4}")]
    InsufficientHoldings { required: f64, available: f64 },

    #[error("Invalid trade amount: {0}")]
    InvalidAmount(f64),

    #[error("Invalid trade price: {0}")]
    InvalidPrice(f64),
}

pub type TradeResult<T> = std::result::Result<T, TradeError>;
