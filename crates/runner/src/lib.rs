//! BananaCoin Runner - Game Session Orchestration
//!
//! Runs market sessions end to end:
//!
//! - **Session**: one game's market, agents and users, advanced one tick at a time
//! - **Orchestrator**: session registry, tokio tick loops and the control surface
//! - **Snapshot**: flat key-value persistence and restore
//! - **Memory**: in-process store and transaction log
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────┐
//!   control ───────► │   SessionOrchestrator    │ ◄─── StrategySupplier
//!   (start/stop/     │  DashMap<id, session>    │      (custom bot code)
//!    trade/toggle)   └────────────┬─────────────┘
//!                                 │ one tokio task per session
//!                                 ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                       Session (locked)                       │
//!   │                                                              │
//!   │   MarketEngine ──price──► TradingAgents ──decisions──┐       │
//!   │        ▲                                             ▼       │
//!   │        └──────────── pool ◄──────────────── TradeExecutor    │
//!   └──────────────────────────────┬───────────────────────┬───────┘
//!                                  │ snapshot              │ TradeRecord
//!                                  ▼                       ▼
//!                            SessionStore        TransactionRecorder
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod session;
pub mod snapshot;

// Re-export main types
pub use config::{ConfigError, SessionConfig};
pub use error::{Result, RunnerError};
pub use memory::{InMemoryStore, TransactionLog, TransactionStats};
pub use orchestrator::{PurchaseReceipt, SessionOrchestrator};
pub use session::{
    LeaderboardEntry, Session, SessionReport, SessionStatus, ShockBanner, StepReport, UserAccount,
};
pub use snapshot::{DecodedSession, SessionSnapshot, SnapshotError};
