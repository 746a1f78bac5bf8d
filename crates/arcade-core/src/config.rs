//! Configuration file loading
//!
//! ```toml
//! [sandbox]
//! total_frames = 300
//! seed = 42
//! watched_paths = ["score", "player.x"]
//!
//! [sandbox.fuzzer]
//! click_period = 60
//!
//! [workflow]
//! max_retries = 2
//! ```

use crate::error::ConfigError;
use crate::types::WorkflowConfig;
use arcade_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub sandbox: SandboxConfig,
    pub workflow: WorkflowConfig,
}

impl ArcadeConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed TOML
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` or `ConfigError::Parse`
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&text)
    }

    /// Load from `path` if given, otherwise defaults
    ///
    /// # Errors
    /// Same as [`ArcadeConfig::load`]
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ArcadeConfig::from_toml("").unwrap(), ArcadeConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = ArcadeConfig::from_toml(
            "[sandbox]\ntotal_frames = 60\nseed = 9\n\n[sandbox.fuzzer]\nclick_period = 30\n\n[workflow]\nmax_retries = 4\n",
        )
        .unwrap();

        assert_eq!(config.sandbox.total_frames, 60);
        assert_eq!(config.sandbox.seed, Some(9));
        assert_eq!(config.sandbox.fuzzer.click_period, 30);
        assert_eq!(config.sandbox.fuzzer.key_block, 30);
        assert_eq!(config.sandbox.surface_width, 800.0);
        assert_eq!(config.workflow.max_retries, 4);
    }

    #[test]
    fn unknown_type_is_parse_error() {
        assert!(matches!(
            ArcadeConfig::from_toml("[workflow]\nmax_retries = \"many\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arcade.toml");
        tokio::fs::write(&path, "[workflow]\npacing_ms = 250\n").await.unwrap();

        let config = ArcadeConfig::load_or_default(Some(path.as_path())).await.unwrap();
        assert_eq!(config.workflow.pacing_ms, 250);

        assert!(matches!(
            ArcadeConfig::load(dir.path().join("missing.toml")).await,
            Err(ConfigError::Io(_))
        ));
    }
}
