//! Scripted generator for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use super::fixtures::sample_content;
use crate::core::StepId;
use crate::errors::GenerationError;
use crate::generation::{GenerationRequest, Generator, ProgressCallback};

/// A generator that replays scripted results per step.
///
/// Each call pops the next scripted result for its step; once the script
/// is exhausted the step returns [`sample_content`]. Every call is
/// recorded.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    scripts: Mutex<HashMap<StepId, VecDeque<Result<Value, GenerationError>>>>,
    calls: Mutex<Vec<GenerationRequest>>,
    partials: Mutex<HashMap<StepId, Vec<Value>>>,
    latency: Option<Duration>,
}

impl ScriptedGenerator {
    /// Creates a generator that succeeds with sample content everywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues results for `step`.
    #[must_use]
    pub fn with_script(
        self,
        step: StepId,
        results: impl IntoIterator<Item = Result<Value, GenerationError>>,
    ) -> Self {
        self.scripts.lock().entry(step).or_default().extend(results);
        self
    }

    /// Makes `step` fail `times` times with `error` before succeeding.
    #[must_use]
    pub fn failing(self, step: StepId, times: usize, error: &GenerationError) -> Self {
        self.with_script(step, std::iter::repeat(error.clone()).take(times).map(Err))
    }

    /// Makes every call to `step` fail with `error`.
    #[must_use]
    pub fn always_failing(self, step: StepId, error: &GenerationError) -> Self {
        self.failing(step, 64, error)
    }

    /// Reports `partials` as progress before each result for `step`.
    #[must_use]
    pub fn with_progress(self, step: StepId, partials: Vec<Value>) -> Self {
        self.partials.lock().insert(step, partials);
        self
    }

    /// Sleeps for `latency` inside every call.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Calls made for `step`.
    #[must_use]
    pub fn call_count(&self, step: StepId) -> usize {
        self.calls.lock().iter().filter(|req| req.step == step).count()
    }

    /// Total calls made.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Step of every call, in call order.
    #[must_use]
    pub fn call_order(&self) -> Vec<StepId> {
        self.calls.lock().iter().map(|req| req.step).collect()
    }

    /// Every recorded request.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<Value, GenerationError> {
        let step = request.step;
        self.calls.lock().push(request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(progress) = progress {
            let partials = self.partials.lock().get(&step).cloned().unwrap_or_default();
            for partial in partials {
                progress(partial);
            }
        }

        let scripted = self.scripts.lock().get_mut(&step).and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(sample_content(step)))
    }
}
