//! Arcade Sandbox
//!
//! Decides whether a generated program is safe to ship by running it
//! headless under synthetic input.
//!
//! # Core Concepts
//!
//! - [`SandboxExecutor`]: compiles `init` / `update` into bounded script programs
//! - [`InputFuzzer`]: temporally coherent pointer and key input
//! - [`CorruptionDetector`]: NaN / infinity checks over watched scratch fields
//! - [`Validator`]: composes the three into a [`Verdict`]
//!
//! # Example
//!
//! ```rust
//! use arcade_artifact::Artifact;
//! use arcade_sandbox::{ArtifactValidator, SandboxConfig, Validator};
//!
//! let validator = Validator::new(SandboxConfig::default().with_frames(30).with_seed(7)).unwrap();
//! let artifact = Artifact::new("Idle", "", "scratch.score = 0;", "scratch.score += 1;");
//! assert!(validator.validate(&artifact).passed);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod detector;
pub mod error;
pub mod executor;
pub mod fuzzer;
pub mod input;
pub mod surface;
pub mod validator;

pub use config::{FuzzerConfig, SandboxConfig};
pub use detector::{default_watched_paths, CorruptionDetector, PathSegment, WatchedPath};
pub use error::{CorruptionError, FailureKind, PathParseError, Phase, SandboxError};
pub use executor::{CompiledProgram, ExecutionLimits, SandboxExecutor, ScratchMemory};
pub use fuzzer::{InputFuzzer, InputSource};
pub use input::{InputSnapshot, ACTION_KEYS, MOVEMENT_KEYS};
pub use surface::Surface;
pub use validator::{ArtifactValidator, ValidationReport, Validator, Verdict};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
