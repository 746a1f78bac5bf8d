//! Error types for the sandbox
//!
//! Every way a validation run can fail:
//! - Compilation of either fragment
//! - An error escaping `init` or `update`
//! - A watched scratch field turning into an invalid number

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which code fragment was running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The one-shot initializer
    Init,
    /// The per-frame updater
    Update,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => f.write_str("init"),
            Phase::Update => f.write_str("update"),
        }
    }
}

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Source did not compile
    Compile,
    /// Error escaped a call
    Runtime,
    /// Watched field became invalid
    Corruption,
}

/// Main sandbox error type
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Fragment is not a valid script body
    #[error("compile error in {phase}: {message}")]
    Compile { phase: Phase, message: String },

    /// Error escaped `init` or `update`
    #[error("runtime error in {}: {message}", location(.phase, .frame))]
    Runtime {
        phase: Phase,
        frame: Option<u32>,
        message: String,
    },

    /// Frame succeeded but left a watched field invalid
    #[error("state corruption at frame {frame}: {source}")]
    Corruption {
        frame: u32,
        source: CorruptionError,
    },
}

impl SandboxError {
    /// Failure classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Compile { .. } => FailureKind::Compile,
            Self::Runtime { .. } => FailureKind::Runtime,
            Self::Corruption { .. } => FailureKind::Corruption,
        }
    }

    /// Attach the frame index to a runtime error
    #[inline]
    #[must_use]
    pub fn at_frame(self, index: u32) -> Self {
        match self {
            Self::Runtime { phase, message, .. } => Self::Runtime {
                phase,
                frame: Some(index),
                message,
            },
            other => other,
        }
    }

    /// Frame index the failure happened on, if any
    #[inline]
    #[must_use]
    pub fn frame(&self) -> Option<u32> {
        match self {
            Self::Compile { .. } => None,
            Self::Runtime { frame, .. } => *frame,
            Self::Corruption { frame, .. } => Some(*frame),
        }
    }
}

fn location(phase: &Phase, frame: &Option<u32>) -> String {
    match frame {
        Some(frame) => format!("{phase} at frame {frame}"),
        None => phase.to_string(),
    }
}

/// A watched numeric field holding NaN or an infinity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{path}' became {value}")]
pub struct CorruptionError {
    /// Watched path, e.g. `scratch.player.x`
    pub path: String,
    /// Rendering of the invalid value
    pub value: String,
}

/// Watched-path syntax errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathParseError {
    /// Empty path
    #[error("empty watched path")]
    Empty,

    /// Segment is not `name` or `name[index]`
    #[error("invalid segment '{segment}' in watched path '{path}'")]
    InvalidSegment { path: String, segment: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_message_names_frame() {
        let err = SandboxError::Runtime {
            phase: Phase::Update,
            frame: None,
            message: "boom".to_string(),
        }
        .at_frame(12);

        assert_eq!(err.to_string(), "runtime error in update at frame 12: boom");
        assert_eq!(err.frame(), Some(12));
        assert_eq!(err.kind(), FailureKind::Runtime);
    }

    #[test]
    fn init_runtime_message() {
        let err = SandboxError::Runtime {
            phase: Phase::Init,
            frame: None,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "runtime error in init: boom");
    }

    #[test]
    fn corruption_message_names_path() {
        let err = SandboxError::Corruption {
            frame: 0,
            source: CorruptionError {
                path: "scratch.score".to_string(),
                value: "NaN".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "state corruption at frame 0: 'scratch.score' became NaN"
        );
        assert_eq!(err.kind(), FailureKind::Corruption);
    }

    #[test]
    fn compile_has_no_frame() {
        let err = SandboxError::Compile {
            phase: Phase::Init,
            message: "unexpected token".to_string(),
        }
        .at_frame(3);
        assert_eq!(err.frame(), None);
        assert!(err.to_string().starts_with("compile error in init"));
    }
}
