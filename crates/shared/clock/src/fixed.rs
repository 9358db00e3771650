use banana_core::Timestamp;
use banana_ports::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Clock frozen at a given instant, advanced manually
pub struct FixedClock {
    now: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self {
            now: RwLock::new(at),
        }
    }

    /// Frozen at the Unix epoch
    pub fn epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now += by;
        }
    }

    pub fn set(&self, at: Timestamp) {
        if let Ok(mut now) = self.now.write() {
            *now = at;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        match self.now.read() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn name(&self) -> &str {
        "FixedClock"
    }
}
