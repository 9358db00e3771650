//! Scheduled shock events
//!
//! One shock per session. It fires at a tick drawn inside a window of the
//! session duration, perturbs the pool reserves once, and keeps a
//! "triggered" flag raised for `decay_ticks` so a banner can show it.
//! [`ShockEvent::intensity`] gives a smooth 0 → 1 → 0 curve over the same
//! window for display; it does not feed back into the price.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Banner titles a shock is drawn from
pub const SHOCK_TITLES: [&str; 12] = [
    "Supply Crash",
    "Monkey Invasion",
    "Banana Shortage",
    "Golden Banana Found",
    "Tropical Storm",
    "Harvest Festival",
    "Market Panic",
    "Investor Frenzy",
    "Banana Boom",
    "Export Ban",
    "Celebrity Endorsement",
    "Disease Outbreak",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockConfig {
    pub enabled: bool,
    /// Earliest firing tick, as a percentage of the session duration
    pub window_start_pct: u32,
    /// Latest firing tick, as a percentage of the session duration
    pub window_end_pct: u32,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    /// Ticks the triggered flag stays raised
    pub decay_ticks: u64,
}

impl Default for ShockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_start_pct: 30,
            window_end_pct: 70,
            min_magnitude: 0.15,
            max_magnitude: 0.25,
            decay_ticks: 10,
        }
    }
}

/// State of the session's shock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockEvent {
    pub scheduled_tick: u64,
    pub title: String,
    /// Signed fraction applied to the pool, set when it fires
    pub magnitude: Option<f64>,
    /// Tick it actually fired at
    pub fired_at: Option<u64>,
    /// Raised while the banner should be visible
    pub triggered: bool,
    pub decay_ticks: u64,
}

impl ShockEvent {
    pub fn is_pending(&self) -> bool {
        self.fired_at.is_none()
    }

    pub fn is_positive(&self) -> Option<bool> {
        self.magnitude.map(|m| m > 0.0)
    }

    /// Display intensity in `[0, 1]` at `tick`
    ///
    /// Natural cubic spline through (fire, 0), (fire + decay/2, 1) and
    /// (fire + decay, 0); zero outside that window.
    pub fn intensity(&self, tick: u64) -> f64 {
        let Some(fired_at) = self.fired_at else {
            return 0.0;
        };
        if tick < fired_at || self.decay_ticks == 0 {
            return 0.0;
        }
        let elapsed = (tick - fired_at) as f64;
        let window = self.decay_ticks as f64;
        if elapsed >= window {
            return 0.0;
        }
        let x = elapsed / window;
        let u = if x <= 0.5 { 2.0 * x } else { 2.0 * (1.0 - x) };
        1.5 * u - 0.5 * u.powi(3)
    }
}

/// Schedules and drives the session's shock event
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShockScheduler {
    config: ShockConfig,
}

impl ShockScheduler {
    pub fn new(config: ShockConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShockConfig {
        &self.config
    }

    /// Tick range `[ceil(start% · d), floor(end% · d)]` for duration `d`
    pub fn window(&self, duration_ticks: u64) -> (u64, u64) {
        // percents are capped at 100, so both bounds fit back into u64
        let scaled = |pct: u32| u128::from(duration_ticks) * u128::from(pct.min(100));
        let lower = scaled(self.config.window_start_pct).div_ceil(100) as u64;
        let upper = ((scaled(self.config.window_end_pct) / 100) as u64).max(lower);
        (lower, upper)
    }

    /// Pick the firing tick and title for a session of `duration_ticks`
    pub fn schedule<R: Rng + ?Sized>(&self, duration_ticks: u64, rng: &mut R) -> ShockEvent {
        let (lower, upper) = self.window(duration_ticks);
        let scheduled_tick = rng.gen_range(lower..=upper);
        let title = SHOCK_TITLES
            .choose(rng)
            .copied()
            .unwrap_or(SHOCK_TITLES[0])
            .to_string();

        log::debug!(
            "Shock '{}' scheduled for tick {} (window {}..={})",
            title,
            scheduled_tick,
            lower,
            upper
        );

        ShockEvent {
            scheduled_tick,
            title,
            magnitude: None,
            fired_at: None,
            triggered: false,
            decay_ticks: self.config.decay_ticks,
        }
    }

    /// Fire the shock once `tick` reaches its scheduled tick
    ///
    /// Returns the signed fraction to hand to the pool. Only ever fires once.
    pub fn maybe_trigger<R: Rng + ?Sized>(
        &self,
        event: &mut ShockEvent,
        tick: u64,
        rng: &mut R,
    ) -> Option<f64> {
        if !event.is_pending() || tick < event.scheduled_tick {
            return None;
        }

        let positive = rng.r#gen::<bool>();
        let size = rng.gen_range(self.config.min_magnitude..=self.config.max_magnitude);
        let signed = if positive { size } else { -size };

        event.magnitude = Some(signed);
        event.fired_at = Some(tick);
        event.triggered = true;

        log::info!(
            "EVENT TRIGGERED at tick {}: {} ({} shock of {:.1}%)",
            tick,
            event.title,
            if positive { "positive" } else { "negative" },
            size * 100.0
        );

        Some(signed)
    }

    /// Lower the triggered flag `decay_ticks` after firing
    ///
    /// Returns true on the falling edge.
    pub fn maybe_reset(&self, event: &mut ShockEvent, tick: u64) -> bool {
        match event.fired_at {
            Some(fired_at) if event.triggered && tick >= fired_at + event.decay_ticks => {
                event.triggered = false;
                log::info!("Event '{}' cleared at tick {}", event.title, tick);
                true
            }
            _ => false,
        }
    }
}
