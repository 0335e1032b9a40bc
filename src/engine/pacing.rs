use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use crate::config::SimulationConfig;

/// Highest position of the speed slider; the slider runs from 0 to this value.
pub const MAX_SLIDER: u32 = 100;

/// Live timing parameters read by every philosopher on each sleep.
///
/// `speed` scales the random thinking and eating times: a smaller value
/// means a faster simulation, zero means no thinking or eating delay.
#[derive(Debug)]
pub struct Pacing {
    speed: AtomicU32,
    frozen: AtomicBool,
    base_sleep_ms: u64,
    gap: Duration,
}

impl Pacing {
    pub fn new(speed: u32, base_sleep_ms: u64, gap: Duration) -> Self {
        Self {
            speed: AtomicU32::new(speed),
            frozen: AtomicBool::new(false),
            base_sleep_ms,
            gap,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.speed,
            config.base_sleep_ms,
            Duration::from_millis(config.utensil_gap_ms),
        )
    }

    /// Maps a slider position to a speed value: further right is faster.
    pub fn speed_from_slider(position: u32) -> u32 {
        MAX_SLIDER - position.min(MAX_SLIDER)
    }

    pub fn speed(&self) -> u32 {
        self.speed.load(Ordering::Relaxed)
    }

    pub fn set_speed(&self, speed: u32) {
        self.speed.store(speed, Ordering::Relaxed);
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Relaxed);
    }

    pub fn thaw(&self) {
        self.frozen.store(false, Ordering::Relaxed);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Relaxed)
    }

    pub fn sleep_time(&self) -> Duration {
        self.scaled(self.base_sleep_ms)
    }

    pub fn eat_time(&self) -> Duration {
        self.scaled(self.base_sleep_ms / 2)
    }

    pub fn gap_time(&self) -> Duration {
        self.gap
    }

    // speed * uniform[0, bound) milliseconds
    fn scaled(&self, bound: u64) -> Duration {
        if bound == 0 {
            return Duration::ZERO;
        }
        let roll = rand::rng().random_range(0..bound);
        Duration::from_millis(u64::from(self.speed()).saturating_mul(roll))
    }
}
