//! The generated program
//!
//! An [`Artifact`] is two opaque code fragments (`init`, run once, and
//! `update`, run once per frame) plus display metadata. Artifacts are
//! immutable: a repaired program is a new value, never an edit of the old one.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// A generated interactive program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(alias = "setupCode")]
    init: String,
    #[serde(alias = "updateCode")]
    update: String,
}

impl Artifact {
    /// Create a new artifact
    #[inline]
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        init: impl Into<String>,
        update: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            init: init.into(),
            update: update.into(),
        }
    }

    /// Parse an artifact from a JSON object.
    ///
    /// Accepts `init`/`update` as well as `setupCode`/`updateCode`.
    ///
    /// # Errors
    /// - `ArtifactError::Malformed` if the text is not a matching JSON object
    /// - `ArtifactError::MissingField` if the title is blank
    pub fn from_json(text: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(text)?;
        artifact.check()?;
        Ok(artifact)
    }

    /// Parse a raw model response.
    ///
    /// Models frequently wrap the JSON object in Markdown code fences even
    /// when told not to; those are stripped before parsing.
    ///
    /// # Errors
    /// Same as [`Artifact::from_json`], plus `ArtifactError::Empty` when
    /// nothing is left after stripping fences.
    pub fn from_model_response(response: &str) -> Result<Self, ArtifactError> {
        let cleaned = strip_code_fences(response);
        if cleaned.is_empty() {
            return Err(ArtifactError::Empty);
        }
        Self::from_json(cleaned)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Display title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Display description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Source of the initializer fragment
    #[inline]
    #[must_use]
    pub fn init(&self) -> &str {
        &self.init
    }

    /// Source of the per-frame updater fragment
    #[inline]
    #[must_use]
    pub fn update(&self) -> &str {
        &self.update
    }

    /// Copy with different code, keeping display metadata
    #[must_use]
    pub fn with_code(&self, init: impl Into<String>, update: impl Into<String>) -> Self {
        Self {
            title: self.title.clone(),
            description: self.description.clone(),
            init: init.into(),
            update: update.into(),
        }
    }

    /// Content fingerprint over all four fields
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_fields(&[&self.title, &self.description, &self.init, &self.update])
    }

    /// Check the fields a usable artifact must carry
    ///
    /// # Errors
    /// Returns `ArtifactError::MissingField` if the title is blank
    pub fn check(&self) -> Result<(), ArtifactError> {
        if self.title.trim().is_empty() {
            return Err(ArtifactError::MissingField("title"));
        }
        Ok(())
    }
}

fn strip_code_fences(response: &str) -> &str {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) on the opening fence line.
        text = rest.split_once('\n').map_or("", |(_, body)| body);
    }
    if let Some(body) = text.trim_end().strip_suffix("```") {
        text = body;
    }
    text.trim()
}

/// Errors related to artifact parsing
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Response contained no payload
    #[error("empty response")]
    Empty,

    /// Required field missing or blank
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Not a valid artifact object
    #[error("malformed artifact: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_camel_case_field_names() {
        let json = r#"{"title":"Pong","description":"d","setupCode":"scratch.a = 1;","updateCode":"scratch.a += 1;"}"#;
        let artifact = Artifact::from_json(json).unwrap();
        assert_eq!(artifact.init(), "scratch.a = 1;");
        assert_eq!(artifact.update(), "scratch.a += 1;");
    }

    #[test]
    fn strips_fences() {
        let response = "```json\n{\"title\":\"T\",\"init\":\"\",\"update\":\"\"}\n```\n";
        let artifact = Artifact::from_model_response(response).unwrap();
        assert_eq!(artifact.title(), "T");
        assert_eq!(artifact.description(), "");
    }

    #[test]
    fn unfenced_response_passes_through() {
        let response = "  {\"title\":\"T\",\"init\":\"a\",\"update\":\"b\"}  ";
        assert!(Artifact::from_model_response(response).is_ok());
    }

    #[test]
    fn blank_title_rejected() {
        let json = r#"{"title":"  ","init":"","update":""}"#;
        assert!(matches!(
            Artifact::from_json(json),
            Err(ArtifactError::MissingField("title"))
        ));
    }

    #[test]
    fn missing_code_is_malformed() {
        let json = r#"{"title":"T","init":""}"#;
        assert!(matches!(
            Artifact::from_json(json),
            Err(ArtifactError::Malformed(_))
        ));
    }

    #[test]
    fn empty_response() {
        assert!(matches!(
            Artifact::from_model_response("```json\n```"),
            Err(ArtifactError::Empty)
        ));
    }

    #[test]
    fn with_code_keeps_metadata_and_changes_fingerprint() {
        let original = Artifact::new("T", "D", "a", "b");
        let fixed = original.with_code("a", "c");
        assert_eq!(fixed.title(), "T");
        assert_eq!(fixed.description(), "D");
        assert_ne!(original.fingerprint(), fixed.fingerprint());
    }
}
