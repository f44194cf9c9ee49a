//! Artifact type produced by a generation step.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::StepId;

/// Artifacts of one run keyed by the step that produced them.
pub type ArtifactMap = BTreeMap<StepId, Artifact>;

/// Artifacts keyed by a free-form id, as accepted by the edit engine.
pub type ArtifactSet = BTreeMap<String, Artifact>;

/// The schema-validated output of one step.
///
/// Artifacts are values: refining one produces a new `Artifact`, the
/// original is never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// The step that produced this artifact.
    pub step_id: StepId,
    /// The agent role that produced it (e.g. "Solution Architect").
    pub role: String,
    /// Structured content; its shape is defined by the step's contract.
    pub content: serde_json::Value,
    /// When the artifact was produced or last refined (ISO 8601).
    pub timestamp: String,
    /// Error attached to the artifact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Artifact {
    /// Creates a new artifact stamped with the current time.
    #[must_use]
    pub fn new(step_id: StepId, role: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            step_id,
            role: role.into(),
            content,
            timestamp: crate::utils::iso_timestamp(),
            error: None,
        }
    }

    /// Attaches an error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns a copy with replaced content and a fresh timestamp.
    #[must_use]
    pub fn revised(&self, content: serde_json::Value) -> Self {
        Self {
            content,
            timestamp: crate::utils::iso_timestamp(),
            ..self.clone()
        }
    }

    /// Hex SHA-256 of the serialized content.
    ///
    /// `serde_json` objects are key-sorted, so equal trees hash equally.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.content).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Re-keys a run's artifacts by step name for editing.
#[must_use]
pub fn into_artifact_set(artifacts: ArtifactMap) -> ArtifactSet {
    artifacts
        .into_iter()
        .map(|(step, artifact)| (step.as_str().to_string(), artifact))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_creation() {
        let artifact = Artifact::new(StepId::Requirements, "Product Analyst", json!({"user_stories": []}));

        assert_eq!(artifact.step_id, StepId::Requirements);
        assert_eq!(artifact.role, "Product Analyst");
        assert!(artifact.error.is_none());
    }

    #[test]
    fn test_revised_keeps_original_untouched() {
        let original = Artifact::new(StepId::Ui, "UI Designer", json!({"screens": ["home"]}));
        let revised = original.revised(json!({"screens": ["home", "settings"]}));

        assert_eq!(original.content, json!({"screens": ["home"]}));
        assert_eq!(revised.content, json!({"screens": ["home", "settings"]}));
        assert_eq!(revised.role, original.role);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Artifact::new(StepId::Ui, "UI Designer", json!({"a": 1, "b": 2}));
        let b = Artifact::new(StepId::Ui, "UI Designer", json!({"b": 2, "a": 1}));
        let c = a.revised(json!({"a": 2}));

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_artifact_serialization_skips_empty_error() {
        let artifact = Artifact::new(StepId::Security, "Security Engineer", json!({}));
        let value = serde_json::to_value(&artifact).unwrap();

        assert_eq!(value["step_id"], "security");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_into_artifact_set_uses_step_names() {
        let mut map = ArtifactMap::new();
        map.insert(StepId::Architecture, Artifact::new(StepId::Architecture, "Architect", json!({})));

        let set = into_artifact_set(map);
        assert!(set.contains_key("architecture"));
    }
}
