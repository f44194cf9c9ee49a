//! Assertions over pipeline results and events.

use crate::core::{PipelineEvent, StepId, StepStatus};
use crate::pipeline::PipelineRunResult;

/// Asserts that `events` have exactly the given type names, in order.
///
/// # Panics
///
/// Panics if the sequences differ.
pub fn assert_event_types(events: &[PipelineEvent], expected: &[&str]) {
    let actual: Vec<&str> = events.iter().map(PipelineEvent::event_type).collect();
    assert_eq!(actual, expected, "event sequence mismatch");
}

/// Asserts that `step` ended with `status`.
///
/// # Panics
///
/// Panics if the step is absent or has a different status.
pub fn assert_step_status(result: &PipelineRunResult, step: StepId, status: StepStatus) {
    let outcome = result
        .outcome(step)
        .unwrap_or_else(|| panic!("step '{step}' was not part of the run"));
    assert_eq!(
        outcome.status, status,
        "step '{step}' has status {} (error: {:?})",
        outcome.status, outcome.error
    );
}
