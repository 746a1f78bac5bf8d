//! Testing utilities for the Arcade workspace
//!
//! Artifact fixtures for the well-known failure shapes, plus recording
//! fakes for the orchestrator's ports and the validator's input source.

#![allow(missing_docs)]

use arcade_artifact::Artifact;
use arcade_core::{Fixer, Generator, UpstreamError};
use arcade_sandbox::{ArtifactValidator, InputSnapshot, InputSource, SandboxConfig, Validator, Verdict};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Keeps a score and a player that follows the pointer
pub fn stable_artifact() -> Artifact {
    Artifact::new(
        "Pointer Chase",
        "A square that follows the pointer",
        "scratch.score = 0; scratch.player = #{ x: 400.0, y: 300.0, vx: 0.0, vy: 0.0, health: 3 };",
        r##"
            let p = scratch.player;
            p.vx = (input.x - p.x) * 0.2;
            p.vy = (input.y - p.y) * 0.2;
            p.x += p.vx;
            p.y += p.vy;
            if input.is_down { scratch.score += 1; }
            if input.keys["ArrowUp"] || input.keys["w"] { p.y -= 2.0; }
            scratch.player = p;
            surface.clear();
            surface.set_fill("#0ff");
            surface.fill_rect(p.x - 5.0, p.y - 5.0, 10, 10);
            surface.fill_text("Score: " + scratch.score, 10, 20);
        "##,
    )
}

/// Divides the score by zero on frame 0
pub fn nan_score_artifact() -> Artifact {
    Artifact::new(
        "Divide By Zero",
        "",
        "scratch.score = 0;",
        "scratch.score = scratch.score / (input.x - input.x);",
    )
}

/// Calls a method on a name that does not exist
pub fn missing_method_artifact() -> Artifact {
    Artifact::new("Ghost Canvas", "", "scratch.score = 0;", "canvas.doesNotExist();")
}

/// Throws once the update has run `frame + 1` times
pub fn throws_at_frame(frame: u32) -> Artifact {
    Artifact::new(
        "Time Bomb",
        "",
        "scratch.ticks = 0;",
        format!("scratch.ticks += 1; if scratch.ticks > {frame} {{ throw \"exploded\"; }}"),
    )
}

/// Fragment that does not parse
pub fn syntax_error_artifact() -> Artifact {
    Artifact::new("Typo", "", "scratch.score = ;", "scratch.score += 1;")
}

/// Never returns from `update`
pub fn busy_loop_artifact() -> Artifact {
    Artifact::new("Spinner", "", "scratch.n = 0;", "loop { scratch.n += 1; }")
}

/// Small, seeded sandbox configuration for fast tests
pub fn quick_config(frames: u32) -> SandboxConfig {
    SandboxConfig::default().with_frames(frames).with_seed(7)
}

/// Validator built from [`quick_config`]
pub fn quick_validator(frames: u32) -> Validator {
    Validator::new(quick_config(frames)).unwrap()
}

/// Input source that records every call
#[derive(Debug, Default)]
pub struct CountingInputSource {
    pub produced: Vec<u32>,
}

impl CountingInputSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSource for CountingInputSource {
    fn initial(&mut self) -> InputSnapshot {
        InputSnapshot::centered(800.0, 600.0)
    }

    fn produce(&mut self, frame: u32, previous: &InputSnapshot) -> InputSnapshot {
        self.produced.push(frame);
        previous.clone()
    }
}

/// Generator returning a fixed artifact and recording topics
#[derive(Debug)]
pub struct RecordingGenerator {
    artifact: Artifact,
    pub topics: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(artifact: Artifact) -> Arc<Self> {
        Arc::new(Self {
            artifact,
            topics: Mutex::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.topics.lock().len()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, topic: &str) -> Result<Artifact, UpstreamError> {
        self.topics.lock().push(topic.to_string());
        Ok(self.artifact.clone())
    }
}

/// Fixer answering from a queue and recording the error texts it received
#[derive(Debug, Default)]
pub struct RecordingFixer {
    replies: Mutex<VecDeque<Artifact>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingFixer {
    /// Replies in order; once empty, echoes the failing artifact back
    pub fn new(replies: Vec<Artifact>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            errors: Mutex::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.errors.lock().len()
    }
}

#[async_trait]
impl Fixer for RecordingFixer {
    async fn fix(&self, artifact: &Artifact, error: &str) -> Result<Artifact, UpstreamError> {
        self.errors.lock().push(error.to_string());
        let reply = self.replies.lock().pop_front();
        Ok(reply.unwrap_or_else(|| artifact.clone()))
    }
}

/// Validator wrapper that counts calls
pub struct CountingValidator<V> {
    inner: V,
    pub calls: Mutex<u32>,
}

impl<V: ArtifactValidator> CountingValidator<V> {
    pub fn new(inner: V) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(0),
        })
    }

    pub fn count(&self) -> u32 {
        *self.calls.lock()
    }
}

impl<V: ArtifactValidator> ArtifactValidator for CountingValidator<V> {
    fn validate(&self, artifact: &Artifact) -> Verdict {
        *self.calls.lock() += 1;
        self.inner.validate(artifact)
    }
}
