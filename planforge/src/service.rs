//! Caller-facing operations: start a run, follow it, edit its output.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::PlanforgeConfig;
use crate::context::RunOptions;
use crate::core::ArtifactSet;
use crate::edit::{self, EditOp, EditResult};
use crate::errors::PlanforgeError;
use crate::generation::Generator;
use crate::jobs::{EventStream, JobRegistry, JobSnapshot};
use crate::pipeline::PipelineSequencer;

/// Entry point for an API layer.
///
/// Owns the job registry and a sequencer over the standard step table.
#[derive(Debug, Clone)]
pub struct PlanningService {
    registry: Arc<JobRegistry>,
    sequencer: Arc<PipelineSequencer>,
    config: PlanforgeConfig,
}

impl PlanningService {
    /// Creates a service backed by `generator`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(generator: Arc<dyn Generator>, config: PlanforgeConfig) -> Result<Self, PlanforgeError> {
        config.validate()?;
        let sequencer = PipelineSequencer::standard(generator)?
            .with_retry_policy(config.retry.clone())
            .with_step_timeout(config.step_timeout());
        Ok(Self::with_sequencer(sequencer, config))
    }

    /// Creates a service around a custom sequencer.
    #[must_use]
    pub fn with_sequencer(sequencer: PipelineSequencer, config: PlanforgeConfig) -> Self {
        Self {
            registry: Arc::new(JobRegistry::from_config(&config)),
            sequencer: Arc::new(sequencer),
            config,
        }
    }

    /// The job registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PlanforgeConfig {
        &self.config
    }

    /// Starts the periodic expired-job sweeper.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        self.registry.spawn_sweeper(self.config.sweep_interval())
    }

    /// Starts a pipeline run and returns its job id without waiting.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlanforgeError::Validation`] if the step selection in
    /// `options` is invalid. No job is created in that case.
    pub fn start_run(
        &self,
        owner: &str,
        diagram_id: &str,
        user_request: &str,
        options: RunOptions,
    ) -> Result<String, PlanforgeError> {
        self.sequencer.select(&options)?;

        let job_id = self.registry.create_job(owner, diagram_id);
        let sequencer = Arc::clone(&self.sequencer);
        let user_request = user_request.to_string();

        self.registry.start(&job_id, move |sink| async move {
            sequencer
                .run(&user_request, options, sink)
                .await
                .map(drop)
                .map_err(|e| e.to_string())
        })?;

        Ok(job_id)
    }

    /// Replays and follows a job's events.
    ///
    /// Returns `None` if the job is unknown or expired.
    #[must_use]
    pub fn stream_events(&self, job_id: &str) -> Option<EventStream> {
        self.registry.stream(job_id, self.config.keepalive_interval())
    }

    /// Current view of a job.
    #[must_use]
    pub fn job(&self, job_id: &str) -> Option<JobSnapshot> {
        self.registry.snapshot(job_id)
    }

    /// Applies edit operations to a copy of `artifacts`.
    #[must_use]
    pub fn edit_artifacts(&self, artifacts: &ArtifactSet, ops: &[EditOp]) -> EditResult {
        edit::apply(artifacts, ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{into_artifact_set, JobStatus, PipelineEvent, StepId};
    use crate::errors::GenerationError;
    use crate::jobs::StreamItem;
    use crate::pipeline::RetryPolicy;
    use crate::testing::ScriptedGenerator;
    use serde_json::json;

    fn config() -> PlanforgeConfig {
        PlanforgeConfig {
            retry: RetryPolicy::new().with_initial_delay_ms(10).with_jitter(false),
            ..PlanforgeConfig::default()
        }
    }

    async fn drain(mut stream: EventStream) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(item) = stream.next().await {
            if let StreamItem::Event(record) = item {
                events.push(record.event);
            }
        }
        events
    }

    #[tokio::test]
    async fn test_run_then_edit() {
        let service = PlanningService::new(Arc::new(ScriptedGenerator::new()), config()).unwrap();

        let job_id = service
            .start_run("user-1", "diagram-1", "Build a todo app", RunOptions::new())
            .unwrap();
        let events = drain(service.stream_events(&job_id).unwrap()).await;

        let Some(PipelineEvent::OrchestrationComplete { artifacts, .. }) = events.last().cloned() else {
            panic!("run did not complete: {events:?}");
        };
        assert_eq!(artifacts.len(), StepId::ALL.len());
        assert_eq!(service.job(&job_id).unwrap().status, JobStatus::Completed);

        let result = service.edit_artifacts(
            &into_artifact_set(artifacts),
            &[EditOp::add_item("ui", "screens", json!({"name": "Settings"}))],
        );
        assert_eq!(result.applied, 1);
        assert_eq!(result.artifacts["ui"].content["screens"][2]["name"], "Settings");
    }

    #[tokio::test]
    async fn test_failed_run_streams_partial_artifacts() {
        let generator = ScriptedGenerator::new()
            .always_failing(StepId::Security, &GenerationError::validation("missing threats"));
        let service = PlanningService::new(Arc::new(generator), config()).unwrap();

        let job_id = service
            .start_run("user-1", "diagram-1", "Build a todo app", RunOptions::new())
            .unwrap();
        let events = drain(service.stream_events(&job_id).unwrap()).await;

        match events.last() {
            Some(PipelineEvent::OrchestrationFailed { error, failed_step, artifacts }) => {
                assert_eq!(error, "missing threats");
                assert_eq!(*failed_step, Some(StepId::Security));
                assert_eq!(artifacts.len(), 2);
            }
            other => panic!("unexpected terminal event {other:?}"),
        }
        assert_eq!(service.job(&job_id).unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_selection_creates_no_job() {
        let service = PlanningService::new(Arc::new(ScriptedGenerator::new()), config()).unwrap();

        let err = service
            .start_run("user-1", "diagram-1", "Build", RunOptions::new().with_steps([StepId::Ui]))
            .unwrap_err();

        assert!(matches!(err, PlanforgeError::Validation(_)));
        assert!(service.registry().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut bad = config();
        bad.step_timeout_ms = 0;
        let err = PlanningService::new(Arc::new(ScriptedGenerator::new()), bad).unwrap_err();
        assert!(matches!(err, PlanforgeError::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_job_has_no_stream() {
        let service = PlanningService::new(Arc::new(ScriptedGenerator::new()), config()).unwrap();
        assert!(service.stream_events("missing").is_none());
    }
}
