//! Integration tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::context::RunOptions;
    use crate::core::{PipelineEvent, StepId, StepStatus};
    use crate::errors::GenerationError;
    use crate::events::{CollectingEventSink, EventSink};
    use crate::failure::FailureCategory;
    use crate::pipeline::{PipelineSequencer, RetryPolicy};
    use crate::testing::{assert_event_types, assert_step_status, sample_content, ScriptedGenerator};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(2)
            .with_initial_delay_ms(100)
            .with_backoff_multiplier(2.0)
            .with_jitter(false)
    }

    fn sequencer(generator: &Arc<ScriptedGenerator>) -> PipelineSequencer {
        PipelineSequencer::standard(generator.clone())
            .unwrap()
            .with_retry_policy(policy())
    }

    fn sink() -> (Arc<CollectingEventSink>, Arc<dyn EventSink>) {
        let collector = Arc::new(CollectingEventSink::new());
        let sink: Arc<dyn EventSink> = collector.clone();
        (collector, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_todo_app_recovers_from_network_errors() {
        let generator = Arc::new(ScriptedGenerator::new().failing(
            StepId::Architecture,
            2,
            &GenerationError::network("connect ECONNREFUSED 10.0.0.1:443"),
        ));
        let (collector, sink) = sink();

        let result = sequencer(&generator)
            .run("Build a todo app", RunOptions::new(), sink)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.steps[1].id, StepId::Architecture);
        assert_eq!(result.steps[1].status, StepStatus::Success);
        assert_eq!(result.steps[1].attempts, 3);
        assert_eq!(generator.call_count(StepId::Architecture), 3);
        assert_eq!(result.artifacts.len(), 7);
        assert_eq!(result.report.total_attempts, 9);
        assert_eq!(result.report.completed_steps, 7);

        let retries: Vec<_> = collector
            .events_of_type("step_retrying")
            .into_iter()
            .map(|event| match event {
                PipelineEvent::StepRetrying { attempt, delay_ms, category, .. } => (attempt, delay_ms, category),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(
            retries,
            vec![(1, 100, FailureCategory::Network), (2, 200, FailureCategory::Network)]
        );
    }

    #[tokio::test]
    async fn test_success_event_sequence() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (collector, sink) = sink();

        let result = sequencer(&generator)
            .run("Build a todo app", RunOptions::new(), sink)
            .await
            .unwrap();

        let mut expected = Vec::new();
        for _ in StepId::ALL {
            expected.extend(["step_started", "step_completed"]);
        }
        expected.push("orchestration_complete");
        assert_event_types(&collector.events(), &expected);

        match collector.events().last() {
            Some(PipelineEvent::OrchestrationComplete { artifacts, report }) => {
                assert_eq!(artifacts, &result.artifacts);
                assert_eq!(report, &result.report);
            }
            other => panic!("unexpected terminal event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_steps_never_run_before_their_dependencies() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (_collector, sink) = sink();

        sequencer(&generator)
            .run("Build a todo app", RunOptions::new(), sink)
            .await
            .unwrap();

        let order = generator.call_order();
        assert_eq!(order, StepId::ALL.to_vec());
        for (position, step) in order.iter().enumerate() {
            for dep in step.definition().dependencies {
                let dep_position = order.iter().position(|s| s == dep).unwrap();
                assert!(dep_position < position, "{step} ran before {dep}");
            }
        }
    }

    #[tokio::test]
    async fn test_fail_fast_preserves_partial_results_for_every_step() {
        for (index, failing) in StepId::ALL.into_iter().enumerate() {
            let generator = Arc::new(ScriptedGenerator::new().always_failing(
                failing,
                &GenerationError::validation(format!("{failing} output malformed")),
            ));
            let (collector, sink) = sink();

            let result = sequencer(&generator)
                .run("Build a todo app", RunOptions::new(), sink)
                .await
                .unwrap();

            assert!(!result.success);
            assert_eq!(result.steps.len(), StepId::ALL.len());
            assert_eq!(result.artifacts.len(), index);
            assert_step_status(&result, failing, StepStatus::Failed);
            assert_eq!(generator.call_count(failing), 1);
            assert_eq!(generator.total_calls(), index + 1);

            for later in &StepId::ALL[index + 1..] {
                assert_step_status(&result, *later, StepStatus::Pending);
            }

            assert_eq!(result.report.failed_step, Some(failing));
            match collector.events().last() {
                Some(PipelineEvent::OrchestrationFailed { error, failed_step, artifacts }) => {
                    assert_eq!(error, &format!("{failing} output malformed"));
                    assert_eq!(*failed_step, Some(failing));
                    assert_eq!(artifacts.len(), index);
                }
                other => panic!("unexpected terminal event {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_the_run() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .always_failing(StepId::Security, &GenerationError::rate_limited("429 Too Many Requests")),
        );
        let (_collector, sink) = sink();

        let result = sequencer(&generator)
            .run("Build a todo app", RunOptions::new(), sink)
            .await
            .unwrap();

        assert!(!result.success);
        let outcome = result.outcome(StepId::Security).unwrap();
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.category, Some(FailureCategory::RateLimit));
        assert_eq!(outcome.error.as_deref(), Some("429 Too Many Requests"));
        assert_eq!(
            result.artifacts.keys().copied().collect::<Vec<_>>(),
            vec![StepId::Requirements, StepId::Architecture]
        );
    }

    #[tokio::test]
    async fn test_prompts_carry_dependency_artifacts() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (_collector, sink) = sink();

        sequencer(&generator)
            .run("Build a todo app", RunOptions::new(), sink)
            .await
            .unwrap();

        let requests = generator.requests();
        let architecture = requests.iter().find(|r| r.step == StepId::Architecture).unwrap();
        assert!(architecture.prompt.contains("Build a todo app"));
        assert!(architecture.prompt.contains("Add a todo"));
        assert_eq!(architecture.contract.name, "architecture");

        let requirements = requests.iter().find(|r| r.step == StepId::Requirements).unwrap();
        assert!(requirements.prompt.starts_with("You are the Product Analyst."));
        assert!(!requirements.prompt.contains("Add a todo"));
    }

    #[tokio::test]
    async fn test_subset_run() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (collector, sink) = sink();

        let options = RunOptions::new().with_steps([StepId::Ui, StepId::Architecture, StepId::Requirements]);
        let result = sequencer(&generator)
            .run("Build a todo app", options, sink)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(
            generator.call_order(),
            vec![StepId::Requirements, StepId::Architecture, StepId::Ui]
        );
        assert_eq!(result.report.total_steps, 3);
        assert_eq!(result.artifacts[&StepId::Ui].content, sample_content(StepId::Ui));
        assert_eq!(collector.events_of_type("orchestration_complete").len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_subset_runs_nothing() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (collector, sink) = sink();

        let err = sequencer(&generator)
            .run("Build a todo app", RunOptions::new().with_steps([StepId::Verification]), sink)
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-MISSING_DEP"));
        assert_eq!(generator.total_calls(), 0);
        assert!(collector.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_run_overrides() {
        let generator = Arc::new(ScriptedGenerator::new().with_latency(Duration::from_secs(2)));
        let (_collector, sink) = sink();

        let options = RunOptions::new()
            .with_steps([StepId::Requirements])
            .with_step_timeout_ms(500)
            .with_retry(RetryPolicy::no_retry());
        let result = sequencer(&generator)
            .run("Build a todo app", options, sink)
            .await
            .unwrap();

        assert!(!result.success);
        let outcome = result.outcome(StepId::Requirements).unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.category, Some(FailureCategory::Timeout));
    }
}
