//! Caller-supplied options for one pipeline run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::StepId;
use crate::pipeline::RetryPolicy;

/// Options for a single run.
///
/// Unset fields fall back to the sequencer's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Restrict the run to these steps. They still execute in table order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepId>>,
    /// Override the retry policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    /// Override the per-step timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_timeout_ms: Option<u64>,
    /// Free-form values passed through to prompts.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RunOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the run to a subset of steps.
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = StepId>) -> Self {
        self.steps = Some(steps.into_iter().collect());
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Overrides the per-step timeout.
    #[must_use]
    pub const fn with_step_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.step_timeout_ms = Some(timeout_ms);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if `step` is part of this run.
    #[must_use]
    pub fn includes(&self, step: StepId) -> bool {
        self.steps
            .as_ref()
            .map_or(true, |steps| steps.contains(&step))
    }
}
