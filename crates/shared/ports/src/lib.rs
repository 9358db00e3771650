//! BananaCoin Ports
//!
//! Port definitions (traits) for the BananaCoin market simulation.
//! These define the boundaries between the simulation core and the
//! collaborators it does not own: persistence, transaction history,
//! the custom strategy generator and time.

mod clock;
mod error;
mod recorder;
mod store;
mod supplier;

pub use clock::Clock;
pub use error::{RecorderError, StoreError, StoreResult, SupplierError};
pub use recorder::{NullRecorder, TransactionRecorder};
pub use store::{Fields, SessionStore};
pub use supplier::StrategySupplier;
