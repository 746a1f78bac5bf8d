//! Scripted replay agent
//!
//! Plays back recorded model responses so a full workflow can be run
//! offline. The first response answers `generate`; each later one answers
//! the next `fix`.

use crate::error::UpstreamError;
use crate::ports::{Fixer, Generator};
use arcade_artifact::Artifact;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;

/// One recorded model response
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordedResponse {
    /// Raw response text, possibly fenced
    Raw(String),
    /// Already structured artifact
    Artifact(Artifact),
}

impl RecordedResponse {
    fn into_artifact(self) -> Result<Artifact, UpstreamError> {
        match self {
            Self::Raw(text) => Ok(Artifact::from_model_response(&text)?),
            Self::Artifact(artifact) => {
                artifact.check()?;
                Ok(artifact)
            }
        }
    }
}

/// Generator and Fixer backed by a recorded response list
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    generation: Mutex<Option<RecordedResponse>>,
    repairs: Mutex<VecDeque<RecordedResponse>>,
}

impl ScriptedAgent {
    /// Build from responses in order
    #[must_use]
    pub fn new(responses: Vec<RecordedResponse>) -> Self {
        let mut responses: VecDeque<_> = responses.into();
        let generation = responses.pop_front();
        Self {
            generation: Mutex::new(generation),
            repairs: Mutex::new(responses),
        }
    }

    /// Parse a JSON array of responses
    ///
    /// # Errors
    /// Returns `UpstreamError::Transport` if the document is not a response list
    pub fn from_json(text: &str) -> Result<Self, UpstreamError> {
        let responses: Vec<RecordedResponse> = serde_json::from_str(text)
            .map_err(|e| UpstreamError::Transport(format!("unreadable replay script: {e}")))?;
        Ok(Self::new(responses))
    }

    /// Load a replay script from disk
    ///
    /// # Errors
    /// Returns `UpstreamError::Transport` on I/O or parse failure
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, UpstreamError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UpstreamError::Transport(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Recorded repairs not yet used
    #[must_use]
    pub fn remaining_repairs(&self) -> usize {
        self.repairs.lock().len()
    }
}

#[async_trait]
impl Generator for ScriptedAgent {
    async fn generate(&self, topic: &str) -> Result<Artifact, UpstreamError> {
        tracing::debug!(topic, "Replaying recorded generation");
        let response = self
            .generation
            .lock()
            .take()
            .ok_or(UpstreamError::Exhausted("generate"))?;
        response.into_artifact()
    }
}

#[async_trait]
impl Fixer for ScriptedAgent {
    async fn fix(&self, artifact: &Artifact, error: &str) -> Result<Artifact, UpstreamError> {
        tracing::debug!(title = artifact.title(), error, "Replaying recorded repair");
        let response = self
            .repairs
            .lock()
            .pop_front()
            .ok_or(UpstreamError::Exhausted("fix"))?;
        response.into_artifact()
    }
}
