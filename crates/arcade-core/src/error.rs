//! Error types for Arcade Core
//!
//! Provides error handling for:
//! - Generator / Fixer upstream failures
//! - Repository storage failures
//! - Configuration loading
//! - Log trail integrity
//! - Workflow termination

use crate::types::{ArtifactId, WorkflowState};
use arcade_artifact::ArtifactError;

/// Main workflow error type
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Topic was empty
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// Generator or Fixer failed
    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    /// Every validation attempt failed
    #[error("retries exhausted after {attempts} validation attempts; last error: {last_error}")]
    RetriesExhausted {
        /// Validations run
        attempts: u32,
        /// Message of the final failed verdict
        last_error: String,
    },

    /// Transition not in the state table
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: WorkflowState,
        to: WorkflowState,
    },
}

impl WorkflowError {
    /// Whether the error leaves the workflow in `Failed`
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::RetriesExhausted { .. })
    }

    /// Short machine-readable classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTopic(_) => "invalid_topic",
            Self::Upstream(_) => "upstream",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::IllegalTransition { .. } => "illegal_transition",
        }
    }
}

/// Generator / Fixer port errors
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Transport or service failure
    #[error("request failed: {0}")]
    Transport(String),

    /// Response could not be turned into an artifact
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] ArtifactError),

    /// Scripted agent has no more recorded responses
    #[error("no recorded response left for {0}")]
    Exhausted(&'static str),
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Unknown artifact id
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    /// Storage I/O failed
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for the config schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Sandbox watched paths are malformed
    #[error("invalid watched path: {0}")]
    WatchedPath(#[from] arcade_sandbox::PathParseError),
}

/// Log trail errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// Hash chain broken at entry index
    #[error("log integrity violation at entry {0}")]
    IntegrityViolation(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_exhausted_embeds_last_error() {
        let err = WorkflowError::RetriesExhausted {
            attempts: 3,
            last_error: "runtime error in update at frame 0: boom".to_string(),
        };
        assert!(err.to_string().contains("boom"));
        assert!(err.is_terminal());
        assert_eq!(err.kind(), "retries_exhausted");
    }

    #[test]
    fn invalid_topic_is_not_terminal() {
        let err = WorkflowError::InvalidTopic("empty".to_string());
        assert!(!err.is_terminal());
    }

    #[test]
    fn upstream_wraps_artifact_error() {
        let err: UpstreamError = ArtifactError::Empty.into();
        let err: WorkflowError = err.into();
        assert_eq!(err.to_string(), "upstream failure: invalid response: empty response");
    }
}
