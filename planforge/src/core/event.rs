//! Pipeline events emitted while a run progresses.

use serde::{Deserialize, Serialize};

use super::{Artifact, ArtifactMap, StepId};
use crate::failure::FailureCategory;
use crate::pipeline::PipelineReport;

/// A notification of pipeline progress or completion.
///
/// Serialized with a `type` tag, e.g. `{"type": "step_started", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A step was dispatched.
    StepStarted {
        /// The step.
        step: StepId,
        /// The agent role running the step.
        role: String,
    },
    /// Partial content streamed by the generation capability.
    ///
    /// Never validated, never persisted as an artifact.
    StepProgress {
        /// The step.
        step: StepId,
        /// The partial payload.
        partial: serde_json::Value,
    },
    /// A failed attempt will be retried after a back-off.
    StepRetrying {
        /// The step.
        step: StepId,
        /// The attempt that just failed (1-based).
        attempt: u32,
        /// Back-off before the next attempt.
        delay_ms: u64,
        /// Classification of the failure.
        category: FailureCategory,
        /// The failure message.
        error: String,
    },
    /// A step produced a validated artifact.
    StepCompleted {
        /// The step.
        step: StepId,
        /// The artifact.
        artifact: Artifact,
        /// Wall time including retries.
        duration_ms: f64,
        /// Number of generation calls made.
        attempts: u32,
    },
    /// A step failed terminally.
    StepFailed {
        /// The step.
        step: StepId,
        /// The last attempt's error message.
        error: String,
        /// Classification of that error.
        category: FailureCategory,
        /// Number of generation calls made.
        attempts: u32,
        /// Wall time including retries.
        duration_ms: f64,
    },
    /// All steps succeeded.
    OrchestrationComplete {
        /// Every artifact of the run.
        artifacts: ArtifactMap,
        /// Run report.
        report: PipelineReport,
    },
    /// The run halted on a failure.
    OrchestrationFailed {
        /// The first failing step's error message.
        error: String,
        /// The step that failed, when the failure came from a step.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_step: Option<StepId>,
        /// Artifacts completed before the failure.
        #[serde(default)]
        artifacts: ArtifactMap,
    },
}

impl PipelineEvent {
    /// Returns the wire name of the event type.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::StepStarted { .. } => "step_started",
            Self::StepProgress { .. } => "step_progress",
            Self::StepRetrying { .. } => "step_retrying",
            Self::StepCompleted { .. } => "step_completed",
            Self::StepFailed { .. } => "step_failed",
            Self::OrchestrationComplete { .. } => "orchestration_complete",
            Self::OrchestrationFailed { .. } => "orchestration_failed",
        }
    }

    /// Returns the step this event concerns, if any.
    #[must_use]
    pub const fn step(&self) -> Option<StepId> {
        match self {
            Self::StepStarted { step, .. }
            | Self::StepProgress { step, .. }
            | Self::StepRetrying { step, .. }
            | Self::StepCompleted { step, .. }
            | Self::StepFailed { step, .. } => Some(*step),
            Self::OrchestrationComplete { .. } => None,
            Self::OrchestrationFailed { failed_step, .. } => *failed_step,
        }
    }

    /// Returns true for events that end a run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OrchestrationComplete { .. } | Self::OrchestrationFailed { .. }
        )
    }

    /// Creates an `orchestration_failed` event that is not tied to a step.
    #[must_use]
    pub fn run_failed(error: impl Into<String>) -> Self {
        Self::OrchestrationFailed {
            error: error.into(),
            failed_step: None,
            artifacts: ArtifactMap::new(),
        }
    }

    /// Renders the event as a server-sent-events frame.
    #[must_use]
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.event_type(), data)
    }
}
