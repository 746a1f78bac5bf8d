//! Workflow log trail
//!
//! Append-only, SHA-256 chained record of what each agent did during a
//! workflow. Presentation reads it; only the orchestrator writes it.

use crate::error::LogError;
use crate::types::AgentTag;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Ulid,
    pub agent: AgentTag,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "hex_bytes")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub hash: [u8; 32],
}

/// Cloneable handle to a shared log trail
#[derive(Debug, Clone, Default)]
pub struct LogTrail {
    inner: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogTrail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, chaining it to the previous entry
    pub fn append(&self, agent: AgentTag, message: impl Into<String>) -> Ulid {
        let message = message.into();
        tracing::info!(agent = %agent, "{}", message);

        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        let mut entry = LogEntry {
            id: Ulid::new(),
            agent,
            message,
            timestamp: Utc::now(),
            prev_hash,
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);
        let id = entry.id;
        guard.push(entry);
        id
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.lock().clone()
    }

    /// Messages only, in order
    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn verify_integrity(&self) -> Result<(), LogError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, e) in guard.iter().enumerate() {
            if e.prev_hash != prev || e.hash != compute_hash(e) {
                return Err(LogError::IntegrityViolation(index));
            }
            prev = e.hash;
        }
        Ok(())
    }

    #[cfg(test)]
    fn tamper(&self, index: usize, message: &str) {
        self.inner.lock()[index].message = message.to_string();
    }
}

fn compute_hash(entry: &LogEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.id.to_bytes());
    hasher.update(entry.timestamp.timestamp_micros().to_le_bytes());
    hasher.update(entry.agent.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(entry.message.as_bytes());
    hasher.update([0]);
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(&text, &mut out).map_err(serde::de::Error::custom)?;
        Ok(out)
    }
}
