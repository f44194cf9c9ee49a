//! Batch application of edit operations to an artifact set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ops::EditOp;
use crate::core::ArtifactSet;
use crate::errors::EditError;

/// An operation that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditFailure {
    /// The operation as submitted.
    pub op: EditOp,
    /// Why it failed.
    pub error: String,
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditResult {
    /// The revised artifact set.
    pub artifacts: ArtifactSet,
    /// Number of operations applied.
    pub applied: usize,
    /// Operations that failed, in request order.
    pub errors: Vec<EditFailure>,
}

impl EditResult {
    /// Returns true if every operation applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Applies `ops` in order to a copy of `artifacts`.
///
/// The input is never modified. A failing operation is recorded in
/// [`EditResult::errors`] and leaves its artifact as it was before that
/// operation; later operations still run against the state produced by
/// the earlier ones. Touched artifacts get a fresh timestamp.
#[must_use]
pub fn apply(artifacts: &ArtifactSet, ops: &[EditOp]) -> EditResult {
    let mut working = artifacts.clone();
    let mut before: BTreeMap<String, String> = BTreeMap::new();
    let mut applied = 0;
    let mut errors = Vec::new();

    for op in ops {
        let outcome = working
            .get_mut(op.artifact_id())
            .ok_or_else(|| EditError::ArtifactNotFound(op.artifact_id().to_string()))
            .and_then(|artifact| {
                let mut content = artifact.content.clone();
                op.apply_to(&mut content)?;
                before
                    .entry(op.artifact_id().to_string())
                    .or_insert_with(|| artifact.fingerprint());
                *artifact = artifact.revised(content);
                Ok(())
            });

        match outcome {
            Ok(()) => {
                applied += 1;
                tracing::debug!(op = op.kind(), artifact = op.artifact_id(), path = op.path(), "Edit applied");
            }
            Err(error) => {
                tracing::warn!(
                    op = op.kind(),
                    artifact = op.artifact_id(),
                    path = op.path(),
                    error = %error,
                    "Edit rejected"
                );
                errors.push(EditFailure {
                    op: op.clone(),
                    error: error.to_string(),
                });
            }
        }
    }

    for (id, fingerprint) in &before {
        if let Some(artifact) = working.get(id) {
            tracing::info!(artifact = %id, before = %fingerprint, after = %artifact.fingerprint(), "Artifact revised");
        }
    }
    tracing::info!(applied, failed = errors.len(), "Edit batch finished");

    EditResult {
        artifacts: working,
        applied,
        errors,
    }
}
