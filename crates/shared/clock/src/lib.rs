//! BananaCoin Clocks
//!
//! Implementations of the [`Clock`] port:
//!
//! - [`SystemClock`]: wall-clock time, used by running sessions
//! - [`FixedClock`]: frozen time that only moves when told to, used by tests
//!   that assert on transaction timestamps

mod fixed;
mod system;

pub use fixed::FixedClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use banana_ports::Clock;
