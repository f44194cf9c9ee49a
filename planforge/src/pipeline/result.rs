//! Per-run results.

use serde::{Deserialize, Serialize};

use crate::core::{ArtifactMap, StepId, StepStatus};
use crate::failure::FailureCategory;

/// The outcome of one step within a run.
///
/// Status only moves forward: pending, running, then success or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step id.
    pub id: StepId,
    /// Current status.
    pub status: StepStatus,
    /// Terminal error message, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Classification of `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
    /// Wall time including retries, in milliseconds.
    pub duration_ms: f64,
    /// Generation calls made.
    pub attempts: u32,
}

impl StepOutcome {
    /// A fresh pending outcome.
    #[must_use]
    pub const fn pending(id: StepId) -> Self {
        Self {
            id,
            status: StepStatus::Pending,
            error: None,
            category: None,
            duration_ms: 0.0,
            attempts: 0,
        }
    }

    /// Moves to `status` if the transition is allowed.
    ///
    /// Returns false and leaves the outcome untouched otherwise.
    pub fn transition(&mut self, status: StepStatus) -> bool {
        if self.status.can_transition_to(status) {
            self.status = status;
            true
        } else {
            false
        }
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Steps selected for the run.
    pub total_steps: usize,
    /// Steps that succeeded.
    pub completed_steps: usize,
    /// The first step that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<StepId>,
    /// That step's error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Generation calls across all steps.
    pub total_attempts: u32,
    /// Wall time of the run, in milliseconds.
    pub duration_ms: f64,
}

/// The result of one sequencer run.
///
/// Artifacts of steps that completed before a failure are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// True only if every selected step succeeded.
    pub success: bool,
    /// Artifacts of the successful steps.
    pub artifacts: ArtifactMap,
    /// One outcome per selected step, in execution order.
    pub steps: Vec<StepOutcome>,
    /// Run summary.
    pub report: PipelineReport,
}

impl PipelineRunResult {
    /// Returns the outcome for `step`, if it was part of the run.
    #[must_use]
    pub fn outcome(&self, step: StepId) -> Option<&StepOutcome> {
        self.steps.iter().find(|outcome| outcome.id == step)
    }

    /// The first failed outcome, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|outcome| outcome.status == StepStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_transitions_forward_only() {
        let mut outcome = StepOutcome::pending(StepId::Ui);
        assert!(outcome.transition(StepStatus::Running));
        assert!(outcome.transition(StepStatus::Success));
        assert!(!outcome.transition(StepStatus::Running));
        assert!(!outcome.transition(StepStatus::Failed));
        assert_eq!(outcome.status, StepStatus::Success);
    }

    #[test]
    fn test_pending_cannot_skip_running() {
        let mut outcome = StepOutcome::pending(StepId::Ui);
        assert!(!outcome.transition(StepStatus::Success));
        assert_eq!(outcome.status, StepStatus::Pending);
    }

    #[test]
    fn test_first_failure() {
        let mut failed = StepOutcome::pending(StepId::Architecture);
        failed.transition(StepStatus::Running);
        failed.transition(StepStatus::Failed);

        let result = PipelineRunResult {
            success: false,
            artifacts: ArtifactMap::new(),
            steps: vec![StepOutcome::pending(StepId::Requirements), failed],
            report: PipelineReport::default(),
        };

        assert_eq!(result.first_failure().map(|o| o.id), Some(StepId::Architecture));
        assert!(result.outcome(StepId::Verification).is_none());
    }
}
