//! Content fixtures.

use serde_json::{json, Value};

use crate::core::{Artifact, ArtifactMap, StepId};

/// Content for `step` that satisfies its default contract.
#[must_use]
pub fn sample_content(step: StepId) -> Value {
    match step {
        StepId::Requirements => json!({
            "user_stories": [
                {"id": "US-1", "title": "Add a todo", "priority": "high"},
                {"id": "US-2", "title": "Complete a todo", "priority": "medium"}
            ],
            "functional_requirements": ["Create todos", "Mark todos done"]
        }),
        StepId::Architecture => json!({
            "components": [
                {"name": "web", "kind": "frontend"},
                {"name": "api", "kind": "service"}
            ],
            "apis": [
                {"method": "GET", "path": "/todos"},
                {"method": "POST", "path": "/todos"}
            ]
        }),
        StepId::Security => json!({
            "threats": [{"id": "T-1", "title": "Session hijacking", "mitigation": "Secure cookies"}]
        }),
        StepId::Infrastructure => json!({
            "services": [{"name": "api", "runtime": "container"}, {"name": "db", "runtime": "postgres"}]
        }),
        StepId::Ui => json!({
            "screens": [{"name": "Todo list"}, {"name": "Todo detail"}]
        }),
        StepId::Implementation => json!({
            "tasks": [{"id": 1, "title": "Scaffold API"}, {"id": 2, "title": "Build list screen"}]
        }),
        StepId::Verification => json!({
            "test_cases": [{"id": "TC-1", "covers": "US-1"}]
        }),
    }
}

/// An artifact for `step` carrying [`sample_content`].
#[must_use]
pub fn sample_artifact(step: StepId) -> Artifact {
    let definition = step.definition();
    Artifact::new(step, definition.role, sample_content(step))
}

/// Sample artifacts for every step.
#[must_use]
pub fn sample_artifacts() -> ArtifactMap {
    StepId::ALL
        .into_iter()
        .map(|step| (step, sample_artifact(step)))
        .collect()
}
