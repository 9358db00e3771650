//! BananaCoin Market Engine
//!
//! Price formation for one game session. The price is quoted from a pair of
//! pool reserves (`currency / coin`), moved each tick by synthetic order flow
//! and, once per session, by a scheduled shock event.
//!
//! ## Tick pipeline
//!
//! ```text
//! MarketEngine::tick()
//!     │
//!     ├── 1. advance tick counter
//!     ├── 2. ShockScheduler: maybe_trigger / maybe_reset ──► LiquidityPool::apply_shock
//!     ├── 3. LiquidityPool::refloor
//!     ├── 4. LiquidityPool::inject_random_flow (PriceDriver::SyntheticFlow only)
//!     ├── 5. LiquidityPool::refloor
//!     ├── 6. LiquidityPool::quote_price
//!     ├── 7. PriceSeries::append
//!     └── 8. PriceSeries::volatility
//! ```
//!
//! Agent and user trades are applied on top of this by the session, through
//! [`LiquidityPool::apply_trade`].

pub mod config;
pub mod engine;
pub mod error;
pub mod pool;
pub mod series;
pub mod shock;

pub use config::{FlowConfig, MarketConfig, PriceDriver};
pub use engine::{MarketEngine, MarketState, ShockTransition, TickReport, resume_seed};
pub use error::{MarketError, Result};
pub use pool::{FlowSummary, LiquidityPool, PoolLimits};
pub use series::PriceSeries;
pub use shock::{SHOCK_TITLES, ShockConfig, ShockEvent, ShockScheduler};
