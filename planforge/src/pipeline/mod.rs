//! Pipeline definition and execution.
//!
//! This module provides:
//! - The fixed step table
//! - Retry policy and executor
//! - The per-step executor (timeout, validation, progress)
//! - The fail-fast sequencer and its run result

mod executor;
#[cfg(test)]
mod integration_tests;
mod result;
mod retry;
mod sequencer;
mod steps;

pub use executor::{StepExecution, StepExecutor};
pub use result::{PipelineReport, PipelineRunResult, StepOutcome};
pub use retry::{
    with_retry, RetryExecutor, RetryNotice, RetryOutcome, RetryPolicy, JITTER_MAX, JITTER_MIN,
};
pub use sequencer::{validate_steps, PipelineSequencer, DEFAULT_STEP_TIMEOUT};
pub use steps::{default_steps, PipelineStepDefinition};
