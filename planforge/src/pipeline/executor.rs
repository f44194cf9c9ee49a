//! Single-step execution: generate, time-box, validate, retry.

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::result::StepOutcome;
use super::retry::{RetryExecutor, RetryPolicy};
use super::steps::PipelineStepDefinition;
use crate::context::AgentContext;
use crate::core::{Artifact, PipelineEvent, StepStatus};
use crate::errors::GenerationError;
use crate::events::EventSink;
use crate::failure::FailureCategory;
use crate::generation::{GenerationRequest, Generator, ProgressCallback};
use crate::observability::{step_span, SpanTimer};

/// What one step produced.
#[derive(Debug, Clone)]
pub struct StepExecution {
    /// Terminal outcome (`success` or `failed`).
    pub outcome: StepOutcome,
    /// The validated artifact, on success.
    pub artifact: Option<Artifact>,
}

/// Runs one step under a retry policy and time budget.
///
/// Partial payloads reported by the generator become `step_progress`
/// events; only the complete value is validated against the contract.
#[derive(Clone)]
pub struct StepExecutor {
    generator: Arc<dyn Generator>,
    retry: RetryExecutor,
    timeout: Duration,
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("policy", self.retry.policy())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StepExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            generator,
            retry: RetryExecutor::new(policy),
            timeout,
        }
    }

    /// Executes `definition` against `ctx`, reporting through `sink`.
    pub async fn execute(
        &self,
        definition: &PipelineStepDefinition,
        ctx: &AgentContext,
        sink: &Arc<dyn EventSink>,
    ) -> StepExecution {
        let span = step_span(definition.id, definition.role);
        self.execute_inner(definition, ctx, sink).instrument(span).await
    }

    async fn execute_inner(
        &self,
        definition: &PipelineStepDefinition,
        ctx: &AgentContext,
        sink: &Arc<dyn EventSink>,
    ) -> StepExecution {
        let step = definition.id;
        let timer = SpanTimer::start(step.as_str());

        let mut outcome = StepOutcome::pending(step);
        outcome.transition(StepStatus::Running);
        sink.emit(PipelineEvent::StepStarted {
            step,
            role: definition.role.to_string(),
        });
        tracing::info!(step = %step, "Step started");

        let request = GenerationRequest {
            step,
            role: definition.role.to_string(),
            prompt: ctx.render_prompt(definition.role, definition.instruction, definition.dependencies),
            contract: definition.contract.clone(),
        };

        let progress: ProgressCallback = {
            let sink = Arc::clone(sink);
            Arc::new(move |partial| sink.emit(PipelineEvent::StepProgress { step, partial }))
        };

        let timeout = self.timeout;
        let contract = &definition.contract;
        let retried = self
            .retry
            .run_with_hook(
                || {
                    let generator = Arc::clone(&self.generator);
                    let request = request.clone();
                    let progress = Arc::clone(&progress);
                    async move {
                        let value = tokio::time::timeout(timeout, generator.generate(request, Some(progress)))
                            .await
                            .map_err(|_| {
                                GenerationError::timeout(format!(
                                    "Step '{step}' timed out after {}ms",
                                    timeout.as_millis()
                                ))
                                .with_category(FailureCategory::Timeout)
                            })??;

                        contract.validate(&value).map_err(|e| {
                            GenerationError::validation(format!(
                                "Schema validation failed for '{}': {e}",
                                contract.name
                            ))
                            .with_category(FailureCategory::Validation)
                        })?;

                        Ok(value)
                    }
                },
                |notice| {
                    sink.emit(PipelineEvent::StepRetrying {
                        step,
                        attempt: notice.attempt,
                        delay_ms: u64::try_from(notice.delay.as_millis()).unwrap_or(u64::MAX),
                        category: notice.category,
                        error: notice.error.message.clone(),
                    });
                },
            )
            .await;

        let duration_ms = timer.finish();
        outcome.duration_ms = duration_ms;
        outcome.attempts = retried.attempts;

        match (retried.result, retried.error) {
            (Some(content), _) => {
                outcome.transition(StepStatus::Success);
                let artifact = Artifact::new(step, definition.role, content);
                tracing::info!(step = %step, attempts = retried.attempts, duration_ms, "Step completed");
                sink.emit(PipelineEvent::StepCompleted {
                    step,
                    artifact: artifact.clone(),
                    duration_ms,
                    attempts: retried.attempts,
                });
                StepExecution {
                    outcome,
                    artifact: Some(artifact),
                }
            }
            (None, error) => {
                let error =
                    error.unwrap_or_else(|| GenerationError::execution("Step produced no value"));
                let category = retried
                    .category
                    .unwrap_or_else(|| crate::failure::classify(&error).category);

                outcome.transition(StepStatus::Failed);
                outcome.error = Some(error.message.clone());
                outcome.category = Some(category);

                tracing::warn!(
                    step = %step,
                    attempts = retried.attempts,
                    %category,
                    error = %error,
                    "Step failed"
                );
                sink.emit(PipelineEvent::StepFailed {
                    step,
                    error: error.message,
                    category,
                    attempts: retried.attempts,
                    duration_ms,
                });
                StepExecution {
                    outcome,
                    artifact: None,
                }
            }
        }
    }
}
