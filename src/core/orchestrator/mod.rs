mod rollback;
mod run;
mod stages;
mod wait;

pub use stages::PipelineStage;

use crate::agents::AgentRegistry;
use crate::config::ParametersConfig;
use crate::constants::{DEFAULT_POLL_INTERVAL, DEFAULT_STAGE_TIMEOUT};
use crate::core::queue::{QueuePriority, QueueTuning, TaskQueueManager};
use crate::core::task::{Task, TaskHandle};
use crate::core::workflow::{Workflow, WorkflowStateTracker, WorkflowUpdate};
use crate::errors::Error;
use crate::utils::parse_duration_field;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Resolved timing and queue settings one orchestrator runs with
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Ceiling on how long one stage may wait for its task batch
    pub stage_timeout: Duration,
    /// Interval between two status polls
    pub poll_interval: Duration,
    /// Tunings of the three priority queues
    pub queues: Vec<QueueTuning>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_parameters(&ParametersConfig::default())
            .expect("default pipeline settings are valid")
    }
}

impl PipelineSettings {
    /// Resolves the optional configuration section into concrete settings
    pub fn from_parameters(params: &ParametersConfig) -> Result<Self, Error> {
        Ok(Self {
            stage_timeout: parse_duration_field(
                "stage_timeout",
                params.stage_timeout.as_deref(),
                DEFAULT_STAGE_TIMEOUT,
            )?,
            poll_interval: parse_duration_field(
                "poll_interval",
                params.poll_interval.as_deref(),
                DEFAULT_POLL_INTERVAL,
            )?,
            queues: vec![
                QueueTuning::from_settings(
                    QueuePriority::High,
                    params.queues.as_ref().and_then(|q| q.high.as_ref()),
                )?,
                QueueTuning::from_settings(
                    QueuePriority::Normal,
                    params.queues.as_ref().and_then(|q| q.normal.as_ref()),
                )?,
                QueueTuning::from_settings(
                    QueuePriority::Low,
                    params.queues.as_ref().and_then(|q| q.low.as_ref()),
                )?,
            ],
        })
    }
}

/// Drives the seven-stage pipeline from outline to finished book
pub struct StageOrchestrator {
    pub(crate) queue_manager: Arc<TaskQueueManager>,
    pub(crate) tracker: Arc<WorkflowStateTracker>,
    pub(crate) settings: PipelineSettings,
    spinner: ProgressBar,
    interactive: bool,
}

impl StageOrchestrator {
    /// Creates an orchestrator with its own queues and workflow registry, so
    /// multiple independent orchestrators can coexist in one process.
    pub fn new(registry: Arc<AgentRegistry>, settings: PipelineSettings) -> Self {
        let queue_manager = Arc::new(TaskQueueManager::new(
            Arc::clone(&registry),
            settings.queues.clone(),
        ));
        Self {
            queue_manager,
            tracker: Arc::new(WorkflowStateTracker::new()),
            settings,
            spinner: ProgressBar::new_spinner(),
            interactive: false,
        }
    }

    /// Enables the interactive progress spinner, for CLI use
    pub fn with_progress(mut self) -> Self {
        self.interactive = true;
        self.init_spinner();
        self
    }

    /// The workflow registry, kept reachable for diagnostics after a run
    pub fn tracker(&self) -> &Arc<WorkflowStateTracker> {
        &self.tracker
    }

    /// Returns the current snapshot of a workflow, or `None` if unknown
    pub async fn get_workflow_state(&self, id: &str) -> Option<Workflow> {
        self.tracker.get(id).await
    }

    /// Cancels a running workflow, force-failing its non-terminal tasks
    pub async fn cancel_workflow(&self, id: &str) -> Result<(), Error> {
        self.tracker.cancel(id).await
    }

    /// Enqueues one stage's tasks and attaches each to the workflow
    pub(crate) async fn enqueue_batch(
        &self,
        workflow_id: &str,
        tasks: Vec<(Task, QueuePriority)>,
    ) -> Result<Vec<TaskHandle>, Error> {
        let mut handles = Vec::with_capacity(tasks.len());
        for (task, priority) in tasks {
            let handle = self.queue_manager.enqueue(task, priority).await;
            self.tracker
                .attach_task(workflow_id, Arc::clone(&handle))
                .await?;
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Records that a stage finished and moves the step counter forward
    pub(crate) async fn advance(
        &self,
        workflow_id: &str,
        stage: PipelineStage,
    ) -> Result<(), Error> {
        self.tracker
            .update(workflow_id, WorkflowUpdate::step(stage.step()))
            .await?;
        info!(workflow = %workflow_id, stage = stage.name(), step = stage.step(), "stage finished");
        Ok(())
    }

    /// Logs a progress line and mirrors it on the spinner when interactive
    pub(crate) fn report(&self, message: &str) {
        info!("{}", message);
        if self.interactive {
            self.spinner.set_message(message.to_string());
        }
    }

    pub(crate) fn finish_progress(&self) {
        if self.interactive {
            self.spinner.finish_and_clear();
        }
    }

    fn init_spinner(&mut self) {
        self.spinner
            .enable_steady_tick(std::time::Duration::from_millis(120));
        self.spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner} [{elapsed_precise}] {msg}")
                .expect("Failed to set spinner template"),
        );
    }
}
