//! BananaCoin Trade Execution
//!
//! Moves value between a trader's wallet and the liquidity pool:
//!
//! ```text
//!   ┌──────────┐   currency / coins   ┌───────────────┐
//!   │  Wallet  │ ◄──────────────────► │ LiquidityPool │
//!   └────┬─────┘                      └───────────────┘
//!        │ same delta
//!        ▼
//!   ┌──────────────┐        TradeRecord       ┌─────────────────────┐
//!   │ Owner wallet │   TradeExecutor ───────► │ TransactionRecorder │
//!   └──────────────┘                          └─────────────────────┘
//! ```
//!
//! A trade either fully applies or fails with a [`TradeError`] and leaves
//! every balance untouched. There are no partial fills.
//!
//! [`TradeError`]: banana_core::TradeError

pub mod executor;

pub use executor::{Counterparty, Fill, TradeExecutor};
