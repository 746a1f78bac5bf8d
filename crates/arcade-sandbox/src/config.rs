//! Sandbox configuration
//!
//! Defaults reproduce the tuned values: an 800x600 surface, 300 frames
//! (about five seconds at 60fps), a 60-frame click cycle and 30-frame
//! movement-key blocks.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Validation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Drawing surface width
    pub surface_width: f64,
    /// Drawing surface height
    pub surface_height: f64,
    /// Frames executed per validation run
    pub total_frames: u32,
    /// Fuzzer seed; a random seed is drawn per run when absent
    pub seed: Option<u64>,
    /// Script operations allowed per `init` / `update` call (0 = unlimited)
    pub max_operations: u64,
    /// Wall-clock limit per call in milliseconds
    pub frame_deadline_ms: Option<u64>,
    /// Maximum script function call depth
    pub max_call_depth: usize,
    /// Maximum length of any script string, array or map
    pub max_collection_size: usize,
    /// Scratch-memory paths inspected after every frame
    pub watched_paths: Vec<String>,
    /// Synthetic input policy
    pub fuzzer: FuzzerConfig,
}

impl SandboxConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With frame budget
    #[inline]
    #[must_use]
    pub fn with_frames(mut self, frames: u32) -> Self {
        self.total_frames = frames;
        self
    }

    /// With fixed fuzzer seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// With surface dimensions
    #[inline]
    #[must_use]
    pub fn with_surface(mut self, width: f64, height: f64) -> Self {
        self.surface_width = width;
        self.surface_height = height;
        self
    }

    /// With per-call operation budget
    #[inline]
    #[must_use]
    pub fn with_max_operations(mut self, max: u64) -> Self {
        self.max_operations = max;
        self
    }

    /// With per-call wall-clock deadline
    #[inline]
    #[must_use]
    pub fn with_frame_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.frame_deadline_ms = deadline.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With watched scratch-memory paths
    #[must_use]
    pub fn with_watched_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watched_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Per-call deadline as a duration
    #[inline]
    #[must_use]
    pub fn frame_deadline(&self) -> Option<Duration> {
        self.frame_deadline_ms.map(Duration::from_millis)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            surface_width: 800.0,
            surface_height: 600.0,
            total_frames: 300,
            seed: None,
            max_operations: 5_000_000,
            frame_deadline_ms: Some(2_000),
            max_call_depth: 64,
            max_collection_size: 100_000,
            watched_paths: crate::detector::default_watched_paths(),
            fuzzer: FuzzerConfig::default(),
        }
    }
}

/// Synthetic input policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzerConfig {
    /// Horizontal radius of the orbiting pointer target
    pub orbit_radius_x: f64,
    /// Vertical radius of the orbiting pointer target
    pub orbit_radius_y: f64,
    /// Orbit angular speed in radians per frame
    pub orbit_rate: f64,
    /// Exponential smoothing factor toward the target
    pub smoothing: f64,
    /// Frames per click cycle
    pub click_period: u32,
    /// Frame within a cycle at which the pointer is released
    pub click_hold: u32,
    /// Frames a movement key stays held
    pub key_block: u32,
    /// Chance a movement key is held in a block
    pub hold_probability: f64,
    /// Per-frame chance an action key is pressed
    pub action_press_probability: f64,
    /// Per-frame chance all action keys are released
    pub action_release_probability: f64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            orbit_radius_x: 200.0,
            orbit_radius_y: 150.0,
            orbit_rate: 0.1,
            smoothing: 0.1,
            click_period: 60,
            click_hold: 5,
            key_block: 30,
            hold_probability: 0.7,
            action_press_probability: 0.1,
            action_release_probability: 0.1,
        }
    }
}
