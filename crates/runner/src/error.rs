use banana_core::{AgentId, SessionId, TradeError, UserId};
use banana_market::MarketError;
use banana_ports::StoreError;
use banana_strategy::UnknownStrategyKind;
use thiserror::Error;

use crate::config::ConfigError;
use crate::snapshot::SnapshotError;

/// Failures surfaced by the session control surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunnerError {
    #[error("Market not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} is already running")]
    SessionAlreadyRunning(SessionId),

    #[error("Session {0} is not accepting trades")]
    SessionNotRunning(SessionId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("Invalid purchase: {0}")]
    InvalidPurchase(String),

    #[error(transparent)]
    UnknownKind(#[from] UnknownStrategyKind),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
