//! Ports consumed by the orchestrator
//!
//! Concrete prompt construction and model transport live behind these
//! traits; the orchestrator only ever sees artifacts and error strings.

use crate::error::{RepositoryError, UpstreamError};
use crate::types::ArtifactId;
use arcade_artifact::Artifact;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Produces a first artifact for a topic
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an artifact
    async fn generate(&self, topic: &str) -> Result<Artifact, UpstreamError>;
}

/// Repairs a failing artifact given the validation error text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fixer: Send + Sync {
    /// Return a complete replacement artifact
    async fn fix(&self, artifact: &Artifact, error: &str) -> Result<Artifact, UpstreamError>;
}

/// A stored, rankable artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedArtifact {
    pub id: ArtifactId,
    pub artifact: Artifact,
    pub likes: u64,
    pub saved_at: DateTime<Utc>,
}

impl PersistedArtifact {
    /// Wrap a freshly saved artifact
    #[must_use]
    pub fn new(artifact: Artifact) -> Self {
        Self {
            id: ArtifactId::new(),
            artifact,
            likes: 0,
            saved_at: Utc::now(),
        }
    }
}

/// Ranked artifact storage
#[async_trait]
pub trait Repository: Send + Sync {
    /// Store an artifact. Saving content that is already stored counts as a
    /// like on the existing entry, which is returned.
    async fn save(&self, artifact: Artifact) -> Result<PersistedArtifact, RepositoryError>;

    /// All artifacts, most liked first, newest first among equals
    async fn get_all(&self) -> Result<Vec<PersistedArtifact>, RepositoryError>;

    /// Add one like
    async fn like(&self, id: ArtifactId) -> Result<(), RepositoryError>;
}

/// Sort in leaderboard order
pub(crate) fn rank(entries: &mut [PersistedArtifact]) {
    entries.sort_by(|a, b| {
        b.likes
            .cmp(&a.likes)
            .then_with(|| b.saved_at.cmp(&a.saved_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}
