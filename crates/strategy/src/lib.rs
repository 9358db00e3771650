//! BananaCoin Strategy Framework
//!
//! Trading agents and the strategies that drive them:
//! - Five built-in strategies (random, momentum, mean reversion, market
//!   maker, hedger), each with its own parameter struct
//! - A deterministic per-agent personality scalar
//! - Balance-aware trade sizing
//! - Sandboxed custom strategies compiled from generated scripts
//!
//! ## Decision flow
//!
//! ```text
//!   price history ──┐
//!   current price ──┼──► Strategy::decide ──► sizing::cap_to_wallet ──► Decision
//!   agent wallet ───┘          ▲
//!                              │
//!                       Personality (from agent id)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use banana_strategy::{Strategy, StrategyKind, TradingAgent};
//! use banana_core::AgentId;
//!
//! let agent = TradingAgent::new(
//!     AgentId::generate(),
//!     None,
//!     Strategy::default_for(StrategyKind::Momentum),
//!     1_000.0,
//!     0.0,
//! );
//! let decision = agent.decide(series.prices(), series.current(), &mut rng);
//! ```

pub mod agent;
pub mod personality;
pub mod script;
pub mod sizing;
pub mod strategies;

// Re-export main types
pub use agent::{AgentSummary, TradingAgent};
pub use personality::Personality;
pub use script::{Script, ScriptError};
pub use strategies::custom::register as register_custom;
pub use strategies::{
    CustomConfig, HedgerConfig, MarketMakerConfig, MarketView, MeanReversionConfig,
    MomentumConfig, RandomConfig, Registration, Strategy, StrategyKind, UnknownStrategyKind,
};
