use serde::{Deserialize, Serialize};

/// Per-agent multiplier in `[0.8, 1.2]` perturbing thresholds, windows and
/// trade sizes so same-kind agents do not trade in lockstep
///
/// Derived from the agent identifier with FNV-1a, which is stable across
/// processes and releases (unlike `DefaultHasher`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Personality(f64);

impl Personality {
    pub const MIN: f64 = 0.8;
    pub const MAX: f64 = 1.2;

    /// Unperturbed defaults
    pub const NEUTRAL: Personality = Personality(1.0);

    pub fn from_id(id: &str) -> Self {
        // 401 steps of 0.001 covering 0.800..=1.200
        let step = fnv1a(id.as_bytes()) % 401;
        Self(Self::MIN + step as f64 / 1000.0)
    }

    /// Explicit scalar, clamped into range
    pub fn new(value: f64) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Scale a numeric knob
    pub fn scale(&self, base: f64) -> f64 {
        base * self.0
    }

    /// Scale a window length, never below `min`
    pub fn scale_window(&self, base: usize, min: usize) -> usize {
        ((base as f64 * self.0).round() as usize).max(min)
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}
