use super::task::TaskHandle;
use crate::agents::AgentRegistry;
use crate::config::RetrySettings;
use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
};
use crate::errors::Error;
use crate::utils::parse_duration_field;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded exponential-backoff retry behavior, attached to a queue
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries granted after the first attempt
    pub max_retries: u32,
    /// Factor applied to the delay between consecutive retries
    pub backoff_multiplier: f64,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            initial_delay: humantime::parse_duration(DEFAULT_INITIAL_DELAY)
                .expect("default initial delay parses"),
            max_delay: humantime::parse_duration(DEFAULT_MAX_DELAY)
                .expect("default max delay parses"),
        }
    }
}

impl RetryPolicy {
    /// Builds a policy from the optional configuration section, applying
    /// defaults for absent fields.
    pub fn from_settings(settings: Option<&RetrySettings>) -> Result<Self, Error> {
        let defaults = Self::default();
        let Some(settings) = settings else {
            return Ok(defaults);
        };
        Ok(Self {
            max_retries: settings.max_retries.unwrap_or(defaults.max_retries),
            backoff_multiplier: settings
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            initial_delay: parse_duration_field(
                "initial_delay",
                settings.initial_delay.as_deref(),
                DEFAULT_INITIAL_DELAY,
            )?,
            max_delay: parse_duration_field(
                "max_delay",
                settings.max_delay.as_deref(),
                DEFAULT_MAX_DELAY,
            )?,
        })
    }

    /// Backoff delay applied before retry number `attempt` (1-based):
    /// `min(initial_delay * multiplier^(attempt - 1), max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

/// Executes one task's action with bounded retry and exponential backoff
pub struct RetryExecutor;

impl RetryExecutor {
    /// Runs the task's agent until it succeeds or the retry budget is spent.
    ///
    /// Every failure is retried uniformly up to `policy.max_retries`, so a
    /// permanently failing task performs exactly `max_retries + 1` attempts.
    /// An unknown agent tag counts as an ordinary failure.
    ///
    /// # Arguments
    ///
    /// * `task` - Handle of the task to execute; its status is advanced in place
    /// * `policy` - Retry policy of the owning queue
    /// * `registry` - Registry the task's agent is looked up in
    pub async fn execute(
        task: &TaskHandle,
        policy: &RetryPolicy,
        registry: &AgentRegistry,
    ) -> Result<(), Error> {
        let mut attempt: u32 = 0;

        loop {
            let (task_id, agent_name, task_type, input) = {
                let mut guard = task.lock().await;
                if guard.is_terminal() {
                    // Force-failed by a cancel or rollback while backing off.
                    return Ok(());
                }
                guard.mark_in_progress();
                (
                    guard.id.clone(),
                    guard.agent.clone(),
                    guard.task_type,
                    guard.input.clone(),
                )
            };

            let result = match registry.get_agent(&agent_name) {
                Some(agent) => agent.execute(task_type, &input).await,
                None => Err(format!(
                    "agent '{}' is not registered. Available agents: {}",
                    agent_name,
                    registry.agent_names().join(", ")
                )),
            };

            match result {
                Ok(output) => {
                    debug!(task_id = %task_id, task_type = %task_type, "task completed");
                    task.lock().await.complete(output);
                    return Ok(());
                }
                Err(reason) => {
                    attempt += 1;
                    if attempt <= policy.max_retries {
                        let delay = policy.delay_for_attempt(attempt);
                        warn!(
                            task_id = %task_id,
                            attempt,
                            max_retries = policy.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "task attempt failed, backing off before retry: {}",
                            reason
                        );
                        sleep(delay).await;
                        continue;
                    }

                    task.lock().await.fail(&reason);
                    return Err(Error::TaskExecutionFailed {
                        task_id,
                        attempts: attempt,
                        reason,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentRegistry, StageAgent};
    use crate::core::task::{Task, TaskType};
    use crate::core::task_status::TaskStatus;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyAgent {
        failures: AtomicU32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl StageAgent for FlakyAgent {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn execute(&self, _task_type: TaskType, _input: &Value) -> Result<Value, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err("transient failure".to_string());
            }
            Ok(json!({"ok": true}))
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_multiplier: 2.0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn registry_with(failures: u32, calls: Arc<AtomicU32>) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(FlakyAgent {
            failures: AtomicU32::new(failures),
            calls,
        }));
        registry
    }

    #[tokio::test]
    async fn always_failing_task_spends_the_whole_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = registry_with(u32::MAX, Arc::clone(&calls));
        let handle = Task::new("flaky", TaskType::ChapterDraft, json!({})).into_handle();

        let err = RetryExecutor::execute(&handle, &fast_policy(2), &registry)
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, Error::TaskExecutionFailed { attempts: 3, .. }));
        let task = handle.lock().await;
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = registry_with(2, Arc::clone(&calls));
        let handle = Task::new("flaky", TaskType::ChapterDraft, json!({})).into_handle();

        RetryExecutor::execute(&handle, &fast_policy(2), &registry)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let task = handle.lock().await;
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.output, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn unknown_agent_is_an_ordinary_failure() {
        let registry = AgentRegistry::new();
        let handle = Task::new("ghost", TaskType::ChapterDraft, json!({})).into_handle();

        let err = RetryExecutor::execute(&handle, &fast_policy(1), &registry)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("2 attempts"));
        assert_eq!(handle.lock().await.status, TaskStatus::Failed);
    }

    #[test]
    fn delays_are_non_decreasing_and_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            backoff_multiplier: 2.0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
        };

        let delays: Vec<_> = (1..=5).map(|a| policy.delay_for_attempt(a)).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        assert_eq!(delays[3], Duration::from_millis(400));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= policy.max_delay));
    }
}
