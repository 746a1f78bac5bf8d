//! Core types for the orchestrator
//!
//! Defines:
//! - Workflow states
//! - Log trail agent tags
//! - Persisted artifact identifiers
//! - Workflow configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use ulid::Ulid;

/// Orchestrator workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Waiting for a topic
    Idle,
    /// Analyzing the topic
    Planning,
    /// Generator or Fixer producing an artifact
    Generating,
    /// Artifact under validation
    Validating,
    /// Artifact published
    Deployed,
    /// Workflow halted
    Failed,
}

impl WorkflowState {
    /// Every state, in lifecycle order
    pub const ALL: [WorkflowState; 6] = [
        Self::Idle,
        Self::Planning,
        Self::Generating,
        Self::Validating,
        Self::Deployed,
        Self::Failed,
    ];

    /// Whether the workflow has ended
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deployed | Self::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Planning => "PLANNING",
            Self::Generating => "GENERATING",
            Self::Validating => "VALIDATING",
            Self::Deployed => "DEPLOYED",
            Self::Failed => "FAILED",
        };
        f.pad(name)
    }
}

/// Which role wrote a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentTag {
    /// Workflow control
    Director,
    /// Generation and repair
    Engineer,
    /// Validation
    Qa,
}

impl fmt::Display for AgentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Director => "DIRECTOR",
            Self::Engineer => "ENGINEER",
            Self::Qa => "QA",
        };
        f.pad(name)
    }
}

/// Unique persisted artifact identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Ulid);

impl ArtifactId {
    /// Generate new artifact ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim()).map(Self)
    }
}

/// Workflow configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Repairs allowed after the first failed validation
    pub max_retries: u32,
    /// Delay between phases in milliseconds
    pub pacing_ms: u64,
}

impl WorkflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With retry bound
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// With pacing delay
    #[inline]
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing_ms = u64::try_from(pacing.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Pacing delay as a duration
    #[inline]
    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            pacing_ms: 0,
        }
    }
}
