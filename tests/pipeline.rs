//! End-to-end pipeline tests.
//!
//! These tests drive the orchestrator through whole runs with the built-in
//! template agents, plus scripted doubles for the failure scenarios. No
//! external service is involved, so they are safe to run in CI.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scrollforge::agents::{
    AgentRegistry, DrafterAgent, EnhancerAgent, FactCheckerAgent, FormatterAgent, IndexerAgent,
    StageAgent, ValidatorAgent, DRAFTER_AGENT, VALIDATOR_AGENT,
};
use scrollforge::config::{ChapterOutline, OutlineConfig};
use scrollforge::constants::INTEGRITY_HASH_PREFIX;
use scrollforge::core::{
    PipelineSettings, QueuePriority, QueueTuning, RetryPolicy, StageOrchestrator, TaskStatus,
    TaskType, WorkflowStatus,
};
use scrollforge::errors::Error;

fn outline(chapter_count: usize) -> OutlineConfig {
    OutlineConfig {
        title: "Operating Systems from Scratch".to_string(),
        subject: "Systems Programming".to_string(),
        level: "Intermediate".to_string(),
        chapters: (0..chapter_count)
            .map(|i| ChapterOutline {
                title: format!("Chapter {}", i + 1),
                order_index: i as u32,
                topics: vec!["scheduling".to_string(), "virtual memory".to_string()],
                learning_objectives: vec!["reason about context switches".to_string()],
            })
            .collect(),
        reference: Some("OSTEP".to_string()),
    }
}

fn fast_settings(max_retries: u32) -> PipelineSettings {
    let retry = RetryPolicy {
        max_retries,
        backoff_multiplier: 2.0,
        initial_delay: Duration::from_millis(2),
        max_delay: Duration::from_millis(8),
    };
    PipelineSettings {
        stage_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_millis(10),
        queues: vec![
            QueueTuning {
                priority: QueuePriority::High,
                max_concurrency: 3,
                retry_policy: retry.clone(),
            },
            QueueTuning {
                priority: QueuePriority::Normal,
                max_concurrency: 2,
                retry_policy: retry.clone(),
            },
            QueueTuning {
                priority: QueuePriority::Low,
                max_concurrency: 1,
                retry_policy: retry,
            },
        ],
    }
}

/// Registry with every built-in agent except the one the test overrides
fn registry_overriding(double: Arc<dyn StageAgent>) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    registry.register(double);
    registry.register(Arc::new(DrafterAgent));
    registry.register(Arc::new(EnhancerAgent));
    registry.register(Arc::new(FormatterAgent));
    registry.register(Arc::new(FactCheckerAgent));
    registry.register(Arc::new(ValidatorAgent));
    registry.register(Arc::new(IndexerAgent));
    Arc::new(registry)
}

#[tokio::test]
async fn successful_run_produces_a_complete_book() {
    let orchestrator = StageOrchestrator::new(Arc::new(AgentRegistry::builtin()), fast_settings(2));
    let outline = outline(2);

    let document = orchestrator
        .start_pipeline("os-book", &outline)
        .await
        .expect("pipeline should succeed");

    assert_eq!(document.chapters.len(), 2);
    assert!(document.metadata.quality_score > 0.0);
    assert!(document.metadata.last_validated.is_some());
    for chapter in &document.chapters {
        assert!(!chapter.content.is_empty());
        assert!(!chapter.exercises.is_empty());
        assert!(!chapter.summaries.is_empty());
        assert!(!chapter.references.is_empty());
        assert!(!chapter.diagrams.is_empty());
    }

    let digest = document.integrity_hash.as_deref().unwrap();
    let hex_part = digest.strip_prefix(INTEGRITY_HASH_PREFIX).unwrap();
    assert_eq!(hex_part.len(), 64);
    assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));

    let workflows = orchestrator.tracker().list().await;
    assert_eq!(workflows.len(), 1);
    let workflow = &workflows[0];
    assert_eq!(workflow.status, WorkflowStatus::Completed);
    assert_eq!(workflow.current_step, 7);
    assert!(workflow.completed_at.is_some());
}

#[tokio::test]
async fn workflow_snapshots_are_stable_after_completion() {
    let orchestrator = StageOrchestrator::new(Arc::new(AgentRegistry::builtin()), fast_settings(1));
    orchestrator
        .start_pipeline("snapshot-book", &outline(1))
        .await
        .unwrap();

    let id = orchestrator.tracker().list().await[0].id.clone();
    let first = orchestrator.get_workflow_state(&id).await.unwrap();
    let second = orchestrator.get_workflow_state(&id).await.unwrap();
    assert_eq!(first, second);
    assert!(orchestrator.get_workflow_state("unknown-id").await.is_none());
}

/// Validator double that always returns a negative verdict
struct RejectingValidator;

#[async_trait]
impl StageAgent for RejectingValidator {
    fn name(&self) -> &str {
        VALIDATOR_AGENT
    }

    async fn execute(&self, _task_type: TaskType, _input: &Value) -> Result<Value, String> {
        Ok(json!({
            "passed": false,
            "quality_score": 0.1,
            "alignment_score": 0.2,
            "issues": ["chapter 1 contradicts the outline"],
        }))
    }
}

#[tokio::test]
async fn negative_verdict_aborts_and_rolls_back() {
    let orchestrator = StageOrchestrator::new(
        registry_overriding(Arc::new(RejectingValidator)),
        fast_settings(1),
    );

    let err = orchestrator
        .start_pipeline("rejected-book", &outline(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed(_)));
    assert!(err.to_string().contains("validation failed"));

    let workflow = orchestrator.tracker().list().await.remove(0);
    assert_eq!(workflow.status, WorkflowStatus::Failed);
    assert!(workflow.current_step < 7);
    assert_eq!(workflow.current_step, 5);
    assert!(workflow.error.as_deref().unwrap().contains("validation"));

    // Rollback left no owned task pending or in-progress.
    for handle in orchestrator.tracker().owned_tasks(&workflow.id).await {
        assert!(handle.lock().await.is_terminal());
    }
}

/// Drafter double that fails a fixed number of times before delegating to the
/// real drafter
struct FlakyDrafter {
    failures: AtomicU32,
}

#[async_trait]
impl StageAgent for FlakyDrafter {
    fn name(&self) -> &str {
        DRAFTER_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err("draft backend briefly unavailable".to_string());
        }
        DrafterAgent.execute(task_type, input).await
    }
}

#[tokio::test]
async fn transient_draft_failures_are_absorbed_by_retries() {
    let orchestrator = StageOrchestrator::new(
        registry_overriding(Arc::new(FlakyDrafter {
            failures: AtomicU32::new(2),
        })),
        fast_settings(2),
    );

    let document = orchestrator
        .start_pipeline("flaky-book", &outline(1))
        .await
        .expect("third attempt should succeed");
    assert_eq!(document.chapters.len(), 1);

    let workflow = orchestrator.tracker().list().await.remove(0);
    assert_eq!(workflow.status, WorkflowStatus::Completed);
    for handle in orchestrator.tracker().owned_tasks(&workflow.id).await {
        assert_eq!(handle.lock().await.status, TaskStatus::Completed);
    }
}

#[tokio::test]
async fn exhausted_retries_fail_the_stage_and_the_workflow() {
    struct BrokenDrafter;

    #[async_trait]
    impl StageAgent for BrokenDrafter {
        fn name(&self) -> &str {
            DRAFTER_AGENT
        }

        async fn execute(&self, _t: TaskType, _i: &Value) -> Result<Value, String> {
            Err("draft backend is down".to_string())
        }
    }

    let orchestrator = StageOrchestrator::new(
        registry_overriding(Arc::new(BrokenDrafter)),
        fast_settings(1),
    );

    let err = orchestrator
        .start_pipeline("broken-book", &outline(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StageFailed { stage: "draft", .. }));

    let workflow = orchestrator.tracker().list().await.remove(0);
    assert_eq!(workflow.status, WorkflowStatus::Failed);
    assert_eq!(workflow.current_step, 1);
    for handle in orchestrator.tracker().owned_tasks(&workflow.id).await {
        assert_eq!(handle.lock().await.status, TaskStatus::Failed);
    }
}

/// Drafter double that never finishes within the test's wait ceiling
struct StallingDrafter;

#[async_trait]
impl StageAgent for StallingDrafter {
    fn name(&self) -> &str {
        DRAFTER_AGENT
    }

    async fn execute(&self, _t: TaskType, _i: &Value) -> Result<Value, String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(json!({"content": "too late"}))
    }
}

#[tokio::test]
async fn stalled_stage_times_out_naming_the_stuck_task() {
    let mut settings = fast_settings(0);
    settings.stage_timeout = Duration::from_millis(150);
    settings.poll_interval = Duration::from_millis(20);

    let orchestrator =
        StageOrchestrator::new(registry_overriding(Arc::new(StallingDrafter)), settings);

    let err = orchestrator
        .start_pipeline("stuck-book", &outline(1))
        .await
        .unwrap_err();

    let workflow = orchestrator.tracker().list().await.remove(0);
    let stuck_id = workflow.task_ids[0].clone();
    match &err {
        Error::StageTimedOut {
            stage, task_ids, ..
        } => {
            assert_eq!(*stage, "draft");
            assert!(task_ids.contains(&stuck_id));
        }
        other => panic!("expected a timeout error, got {:?}", other),
    }

    assert_eq!(workflow.status, WorkflowStatus::Failed);
    // Rollback forced the stuck task out of in-progress.
    for handle in orchestrator.tracker().owned_tasks(&workflow.id).await {
        assert_eq!(handle.lock().await.status, TaskStatus::Failed);
    }
}

#[tokio::test]
async fn cancelling_a_running_workflow_sticks() {
    struct SlowDrafter;

    #[async_trait]
    impl StageAgent for SlowDrafter {
        fn name(&self) -> &str {
            DRAFTER_AGENT
        }

        async fn execute(&self, _t: TaskType, _i: &Value) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({"content": "slow"}))
        }
    }

    let orchestrator = Arc::new(StageOrchestrator::new(
        registry_overriding(Arc::new(SlowDrafter)),
        fast_settings(0),
    ));

    let runner = Arc::clone(&orchestrator);
    let run = tokio::spawn(async move { runner.start_pipeline("doomed-book", &outline(1)).await });

    // Wait for the run to register its workflow and reach the drafting stage.
    let id = loop {
        let workflows = orchestrator.tracker().list().await;
        if let Some(workflow) = workflows
            .iter()
            .find(|w| w.status == WorkflowStatus::Running && !w.task_ids.is_empty())
        {
            break workflow.id.clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    orchestrator.cancel_workflow(&id).await.unwrap();
    assert!(run.await.unwrap().is_err());

    // The cancel is not overwritten by the stage failure it provokes.
    let workflow = orchestrator.get_workflow_state(&id).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Cancelled);
    assert!(workflow.completed_at.is_some());
    for handle in orchestrator.tracker().owned_tasks(&id).await {
        assert!(handle.lock().await.is_terminal());
    }
}

#[tokio::test]
async fn identical_runs_produce_identical_digests() {
    let outline = outline(2);
    let mut digests = Vec::new();
    for _ in 0..2 {
        let orchestrator =
            StageOrchestrator::new(Arc::new(AgentRegistry::builtin()), fast_settings(1));
        let mut document = orchestrator
            .start_pipeline("repeatable-book", &outline)
            .await
            .unwrap();
        // Normalize the run-dependent parts the digest covers.
        document.metadata.generation_date = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
        document.metadata.last_validated = None;
        for (i, chapter) in document.chapters.iter_mut().enumerate() {
            chapter.id = format!("chapter-{}", i);
        }
        digests.push(document.compute_integrity_hash().unwrap());
    }
    assert_eq!(digests[0], digests[1]);
}

#[tokio::test]
async fn cancelling_an_unknown_workflow_reports_not_found() {
    let orchestrator = StageOrchestrator::new(Arc::new(AgentRegistry::builtin()), fast_settings(0));
    let err = orchestrator.cancel_workflow("nope").await.unwrap_err();
    assert!(matches!(err, Error::WorkflowNotFound(_)));
}
