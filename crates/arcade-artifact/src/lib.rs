//! Arcade Artifact
//!
//! The value object that flows through the generate / validate / repair loop.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: title, description and the `init` / `update` code fragments
//! - [`Fingerprint`]: 32-byte Blake3 digest identifying an artifact's content
//!
//! # Example
//!
//! ```rust
//! use arcade_artifact::Artifact;
//!
//! let artifact = Artifact::new("Dodge", "avoid the squares", "scratch.score = 0;", "scratch.score += 1;");
//! println!("{} ({})", artifact.title(), artifact.fingerprint().short());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod fingerprint;

pub use artifact::{Artifact, ArtifactError};
pub use fingerprint::{Fingerprint, FingerprintError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
