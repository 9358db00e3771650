use thiserror::Error;

/// Errors raised when building a market from configuration or persisted state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Invalid market configuration: {0}")]
    InvalidConfig(String),

    #[error("Price series must contain at least the seed price")]
    EmptySeries,
}

pub type Result<T> = std::result::Result<T, MarketError>;
