//! BananaCoin Core Domain
//!
//! Pure domain types for the BananaCoin market simulation.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod error;
pub mod stats;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Action, Decision, Side, TradeRecord, Wallet};
pub use error::{TradeError, TradeResult};
pub use values::{AgentId, SessionId, Timestamp, UserId};
