//! Input fuzzer
//!
//! Produces temporally coherent synthetic input: the pointer glides toward
//! an orbiting target instead of teleporting, clicks are pulsed on a fixed
//! cycle, movement keys are held for whole blocks of frames and action keys
//! are tapped at random.

use crate::config::{FuzzerConfig, SandboxConfig};
use crate::input::{InputSnapshot, ACTION_KEYS, MOVEMENT_KEYS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of per-frame input snapshots
pub trait InputSource: Send {
    /// Snapshot preceding frame 0
    fn initial(&mut self) -> InputSnapshot;

    /// Snapshot for `frame`, derived from the previous frame's snapshot
    fn produce(&mut self, frame: u32, previous: &InputSnapshot) -> InputSnapshot;
}

/// Seeded synthetic input generator
#[derive(Debug, Clone)]
pub struct InputFuzzer {
    config: FuzzerConfig,
    width: f64,
    height: f64,
    seed: u64,
    rng: StdRng,
}

impl InputFuzzer {
    /// Create a fuzzer for a surface of the given size
    #[must_use]
    pub fn new(config: FuzzerConfig, width: f64, height: f64, seed: u64) -> Self {
        Self {
            config,
            width,
            height,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a fuzzer from sandbox configuration, drawing a seed if none is set
    #[must_use]
    pub fn from_sandbox_config(config: &SandboxConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self::new(
            config.fuzzer.clone(),
            config.surface_width,
            config.surface_height,
            seed,
        )
    }

    /// Seed this fuzzer was created with
    #[inline]
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() {
            return false;
        }
        self.rng.random_bool(probability.clamp(0.0, 1.0))
    }

    fn steer(&self, frame: u32, previous: &InputSnapshot) -> (f64, f64) {
        let angle = f64::from(frame) * self.config.orbit_rate;
        let target_x = self.width / 2.0 + self.config.orbit_radius_x * angle.sin();
        let target_y = self.height / 2.0 + self.config.orbit_radius_y * angle.cos();

        let alpha = self.config.smoothing;
        let x = previous.x + (target_x - previous.x) * alpha;
        let y = previous.y + (target_y - previous.y) * alpha;
        (clamp(x, self.width), clamp(y, self.height))
    }

    fn pulse(&self, frame: u32, previous: bool) -> bool {
        match frame.checked_rem(self.config.click_period) {
            Some(0) => true,
            Some(phase) if phase == self.config.click_hold => false,
            _ => previous,
        }
    }
}

fn clamp(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return max / 2.0;
    }
    value.clamp(0.0, max.max(0.0))
}

impl InputSource for InputFuzzer {
    fn initial(&mut self) -> InputSnapshot {
        InputSnapshot::centered(self.width, self.height)
    }

    fn produce(&mut self, frame: u32, previous: &InputSnapshot) -> InputSnapshot {
        let (x, y) = self.steer(frame, previous);
        let is_down = self.pulse(frame, previous.is_down);
        let mut keys = previous.keys.clone();

        if frame.checked_rem(self.config.key_block) == Some(0) {
            for key in MOVEMENT_KEYS {
                keys.insert(key.to_string(), false);
            }
            if self.chance(self.config.hold_probability) {
                let key = MOVEMENT_KEYS[self.rng.random_range(0..MOVEMENT_KEYS.len())];
                keys.insert(key.to_string(), true);
            }
        }

        if self.chance(self.config.action_press_probability) {
            let key = ACTION_KEYS[self.rng.random_range(0..ACTION_KEYS.len())];
            keys.insert(key.to_string(), true);
        }
        if self.chance(self.config.action_release_probability) {
            for key in ACTION_KEYS {
                keys.insert(key.to_string(), false);
            }
        }

        InputSnapshot { x, y, is_down, keys }
    }
}
