//! Fixed-order, fail-fast step sequencing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::executor::StepExecutor;
use super::result::{PipelineReport, PipelineRunResult, StepOutcome};
use super::retry::RetryPolicy;
use super::steps::{default_steps, PipelineStepDefinition};
use crate::context::{AgentContext, RunOptions};
use crate::core::{ArtifactMap, PipelineEvent, StepId, StepStatus};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::EventSink;
use crate::generation::Generator;
use crate::observability::SpanTimer;

/// Default per-step time budget.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs a validated step table in declaration order.
///
/// The table is checked once at construction: every dependency must be
/// declared earlier. A run stops at the first failed step and keeps the
/// artifacts produced before it.
#[derive(Clone)]
pub struct PipelineSequencer {
    steps: Vec<PipelineStepDefinition>,
    generator: Arc<dyn Generator>,
    policy: RetryPolicy,
    step_timeout: Duration,
}

impl std::fmt::Debug for PipelineSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSequencer")
            .field("steps", &self.step_ids())
            .field("policy", &self.policy)
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl PipelineSequencer {
    /// Creates a sequencer over `steps`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, repeats a step, or declares a
    /// dependency that is not an earlier step.
    pub fn new(
        steps: Vec<PipelineStepDefinition>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, PipelineValidationError> {
        validate_steps(&steps)?;
        Ok(Self {
            steps,
            generator,
            policy: RetryPolicy::default(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        })
    }

    /// Creates a sequencer over the standard seven-step table.
    ///
    /// # Errors
    ///
    /// Returns an error only if the built-in table is inconsistent.
    pub fn standard(generator: Arc<dyn Generator>) -> Result<Self, PipelineValidationError> {
        Self::new(default_steps(), generator)
    }

    /// Sets the default retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the default per-step timeout.
    #[must_use]
    pub const fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// The step ids, in execution order.
    #[must_use]
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|def| def.id).collect()
    }

    /// The step table.
    #[must_use]
    pub fn steps(&self) -> &[PipelineStepDefinition] {
        &self.steps
    }

    /// Resolves the steps selected by `options`, in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected step is not in the table, or if a
    /// selected step depends on one that is not selected.
    pub fn select(&self, options: &RunOptions) -> Result<Vec<&PipelineStepDefinition>, PipelineValidationError> {
        let Some(requested) = &options.steps else {
            return Ok(self.steps.iter().collect());
        };

        let known: HashSet<StepId> = self.steps.iter().map(|def| def.id).collect();
        if let Some(unknown) = requested.iter().find(|id| !known.contains(id)) {
            return Err(PipelineValidationError::new(format!(
                "Step '{unknown}' is not part of this pipeline"
            ))
            .with_steps(vec![unknown.to_string()])
            .with_error_info(ContractErrorInfo::new(
                "CONTRACT-004-UNKNOWN_STEP",
                format!("Unknown step '{unknown}'"),
            )));
        }

        let selected: Vec<_> = self
            .steps
            .iter()
            .filter(|def| requested.contains(&def.id))
            .collect();

        if selected.is_empty() {
            return Err(PipelineValidationError::new("No steps selected for this run")
                .with_error_info(ContractErrorInfo::new("CONTRACT-004-EMPTY", "Empty step selection")));
        }

        for def in &selected {
            if let Some(dep) = def.dependencies.iter().find(|dep| !requested.contains(dep)) {
                return Err(PipelineValidationError::new(format!(
                    "Step '{}' depends on '{}', which is not selected",
                    def.id, dep
                ))
                .with_steps(vec![def.id.to_string(), dep.to_string()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-004-MISSING_DEP",
                        format!("Dependency '{dep}' not selected"),
                    )
                    .with_fix_hint("Include every dependency of a selected step in the run."),
                ));
            }
        }

        Ok(selected)
    }

    /// Runs the selected steps for `user_request`.
    ///
    /// Emits every step event plus exactly one `orchestration_complete` or
    /// `orchestration_failed` through `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error, before any step runs, if the step selection is
    /// invalid.
    pub async fn run(
        &self,
        user_request: &str,
        options: RunOptions,
        sink: Arc<dyn EventSink>,
    ) -> Result<PipelineRunResult, PipelineValidationError> {
        let selected = self.select(&options)?;

        let policy = options.retry.clone().unwrap_or_else(|| self.policy.clone());
        let timeout = options
            .step_timeout_ms
            .map_or(self.step_timeout, Duration::from_millis);
        let executor = StepExecutor::new(Arc::clone(&self.generator), policy, timeout);

        let timer = SpanTimer::start("pipeline");
        let mut artifacts = ArtifactMap::new();
        let mut outcomes: Vec<StepOutcome> =
            selected.iter().map(|def| StepOutcome::pending(def.id)).collect();
        let mut failure: Option<(StepId, String)> = None;

        tracing::info!(steps = selected.len(), "Pipeline run started");

        for (index, def) in selected.iter().enumerate() {
            debug_assert!(def.dependencies.iter().all(|dep| artifacts.contains_key(dep)));

            let ctx = AgentContext::new(user_request, &artifacts, options.clone());
            let execution = executor.execute(def, &ctx, &sink).await;

            if let Some(artifact) = execution.artifact {
                artifacts.insert(def.id, artifact);
            }

            let failed = execution.outcome.status == StepStatus::Failed;
            if failed {
                failure = Some((
                    def.id,
                    execution.outcome.error.clone().unwrap_or_default(),
                ));
            }
            outcomes[index] = execution.outcome;

            if failed {
                break;
            }
        }

        let report = PipelineReport {
            total_steps: outcomes.len(),
            completed_steps: outcomes
                .iter()
                .filter(|outcome| outcome.status == StepStatus::Success)
                .count(),
            failed_step: failure.as_ref().map(|(step, _)| *step),
            error: failure.as_ref().map(|(_, error)| error.clone()),
            total_attempts: outcomes.iter().map(|outcome| outcome.attempts).sum(),
            duration_ms: timer.finish(),
        };

        match &failure {
            None => {
                tracing::info!(
                    completed = report.completed_steps,
                    duration_ms = report.duration_ms,
                    "Pipeline run completed"
                );
                sink.emit(PipelineEvent::OrchestrationComplete {
                    artifacts: artifacts.clone(),
                    report: report.clone(),
                });
            }
            Some((step, error)) => {
                tracing::warn!(
                    failed_step = %step,
                    completed = report.completed_steps,
                    error = %error,
                    "Pipeline run failed"
                );
                sink.emit(PipelineEvent::OrchestrationFailed {
                    error: error.clone(),
                    failed_step: Some(*step),
                    artifacts: artifacts.clone(),
                });
            }
        }

        Ok(PipelineRunResult {
            success: failure.is_none(),
            artifacts,
            steps: outcomes,
            report,
        })
    }
}

/// Checks a step table.
///
/// # Errors
///
/// Returns the first problem found: empty table (`CONTRACT-004-EMPTY`),
/// repeated id (`CONTRACT-004-DUPLICATE`), self dependency
/// (`CONTRACT-004-SELF_DEP`), dependency declared later
/// (`CONTRACT-004-ORDER`) or not at all (`CONTRACT-004-MISSING_DEP`).
pub fn validate_steps(steps: &[PipelineStepDefinition]) -> Result<(), PipelineValidationError> {
    if steps.is_empty() {
        return Err(PipelineValidationError::new("Pipeline has no steps").with_error_info(
            ContractErrorInfo::new("CONTRACT-004-EMPTY", "Empty step table")
                .with_fix_hint("Declare at least one step."),
        ));
    }

    let declared: HashSet<StepId> = steps.iter().map(|def| def.id).collect();
    let mut seen = HashSet::new();

    for def in steps {
        if !seen.insert(def.id) {
            return Err(PipelineValidationError::new(format!(
                "Step '{}' is declared more than once",
                def.id
            ))
            .with_steps(vec![def.id.to_string()])
            .with_error_info(ContractErrorInfo::new(
                "CONTRACT-004-DUPLICATE",
                format!("Duplicate step '{}'", def.id),
            )));
        }

        for dep in def.dependencies {
            if *dep == def.id {
                return Err(PipelineValidationError::new(format!(
                    "Step '{}' depends on itself",
                    def.id
                ))
                .with_steps(vec![def.id.to_string()])
                .with_error_info(ContractErrorInfo::new(
                    "CONTRACT-004-SELF_DEP",
                    format!("Self dependency on '{}'", def.id),
                )));
            }

            if seen.contains(dep) {
                continue;
            }

            let (code, message, hint) = if declared.contains(dep) {
                (
                    "CONTRACT-004-ORDER",
                    format!("Step '{}' depends on '{}', which is declared after it", def.id, dep),
                    "Move the dependency earlier in the step table.",
                )
            } else {
                (
                    "CONTRACT-004-MISSING_DEP",
                    format!("Step '{}' depends on unknown step '{}'", def.id, dep),
                    "Ensure the dependency is added before the step that depends on it.",
                )
            };

            return Err(PipelineValidationError::new(message)
                .with_steps(vec![def.id.to_string(), dep.to_string()])
                .with_error_info(
                    ContractErrorInfo::new(code, format!("Dependency '{dep}' not satisfied"))
                        .with_fix_hint(hint)
                        .with_context_entry("step", def.id.as_str()),
                ));
        }
    }

    Ok(())
}
