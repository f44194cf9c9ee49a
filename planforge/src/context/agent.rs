//! The read-only context handed to each step.

use serde::Serialize;
use std::fmt::Write;

use super::RunOptions;
use crate::core::{Artifact, ArtifactMap, StepId};

/// Inputs visible to one step.
#[derive(Debug, Clone, Serialize)]
pub struct AgentContext {
    /// The original free-text request.
    pub user_request: String,
    /// Successful artifacts of earlier steps.
    pub previous_artifacts: ArtifactMap,
    /// Run options.
    pub options: RunOptions,
}

impl AgentContext {
    /// Builds a context from the artifacts accumulated so far.
    ///
    /// Artifacts carrying an error are left out.
    #[must_use]
    pub fn new(user_request: impl Into<String>, artifacts: &ArtifactMap, options: RunOptions) -> Self {
        let previous_artifacts = artifacts
            .iter()
            .filter(|(_, artifact)| artifact.error.is_none())
            .map(|(id, artifact)| (*id, artifact.clone()))
            .collect();

        Self {
            user_request: user_request.into(),
            previous_artifacts,
            options,
        }
    }

    /// Returns the artifact produced by `step`, if any.
    #[must_use]
    pub fn artifact(&self, step: StepId) -> Option<&Artifact> {
        self.previous_artifacts.get(&step)
    }

    /// Returns true if every step in `dependencies` has an artifact.
    #[must_use]
    pub fn has_all(&self, dependencies: &[StepId]) -> bool {
        dependencies
            .iter()
            .all(|dep| self.previous_artifacts.contains_key(dep))
    }

    /// Renders the prompt for a step.
    ///
    /// Includes the role, the instruction, the request, run metadata and
    /// the content of each dependency artifact as pretty JSON.
    #[must_use]
    pub fn render_prompt(&self, role: &str, instruction: &str, dependencies: &[StepId]) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "You are the {role}.");
        let _ = writeln!(prompt, "{instruction}");
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "## Product request");
        let _ = writeln!(prompt, "{}", self.user_request);

        if !self.options.metadata.is_empty() {
            let mut keys: Vec<_> = self.options.metadata.keys().collect();
            keys.sort();
            let _ = writeln!(prompt);
            let _ = writeln!(prompt, "## Notes");
            for key in keys {
                let _ = writeln!(prompt, "- {key}: {}", self.options.metadata[key]);
            }
        }

        for dep in dependencies {
            let Some(artifact) = self.artifact(*dep) else {
                continue;
            };
            let body = serde_json::to_string_pretty(&artifact.content)
                .unwrap_or_else(|_| artifact.content.to_string());
            let _ = writeln!(prompt);
            let _ = writeln!(prompt, "## {} ({})", dep, artifact.role);
            let _ = writeln!(prompt, "{body}");
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifacts() -> ArtifactMap {
        let mut map = ArtifactMap::new();
        map.insert(
            StepId::Requirements,
            Artifact::new(StepId::Requirements, "Product Analyst", json!({"user_stories": ["login"]})),
        );
        map.insert(
            StepId::Architecture,
            Artifact::new(StepId::Architecture, "Architect", json!({})).with_error("boom"),
        );
        map
    }

    #[test]
    fn test_errored_artifacts_are_excluded() {
        let ctx = AgentContext::new("Build a todo app", &artifacts(), RunOptions::new());

        assert!(ctx.artifact(StepId::Requirements).is_some());
        assert!(ctx.artifact(StepId::Architecture).is_none());
        assert!(ctx.has_all(&[StepId::Requirements]));
        assert!(!ctx.has_all(&[StepId::Requirements, StepId::Architecture]));
    }

    #[test]
    fn test_render_prompt_includes_dependencies() {
        let options = RunOptions::new().with_metadata("platform", json!("web"));
        let ctx = AgentContext::new("Build a todo app", &artifacts(), options);

        let prompt = ctx.render_prompt("Architect", "Design the system.", &[StepId::Requirements]);

        assert!(prompt.starts_with("You are the Architect.\nDesign the system.\n"));
        assert!(prompt.contains("Build a todo app"));
        assert!(prompt.contains("- platform: \"web\""));
        assert!(prompt.contains("## requirements (Product Analyst)"));
        assert!(prompt.contains("\"login\""));
    }
}
