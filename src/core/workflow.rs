use super::task::TaskHandle;
use crate::errors::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Lifecycle status of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Whether the workflow has reached a state it never leaves
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

/// One pipeline run, tracked by step counter and terminal status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    /// Unique identifier of the run
    pub id: String,
    /// Current lifecycle status
    pub status: WorkflowStatus,
    /// Index of the last stage that finished, 0 before any stage
    pub current_step: u32,
    /// Total number of stages in the pipeline
    pub total_steps: u32,
    /// Ids of every task the run owns
    pub task_ids: Vec<String>,
    /// When the run was created
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// Error recorded when the run failed
    pub error: Option<String>,
}

/// Partial update merged into a workflow record
#[derive(Debug, Default, Clone)]
pub struct WorkflowUpdate {
    pub status: Option<WorkflowStatus>,
    pub current_step: Option<u32>,
    pub error: Option<String>,
}

impl WorkflowUpdate {
    pub fn status(status: WorkflowStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn step(current_step: u32) -> Self {
        Self {
            current_step: Some(current_step),
            ..Self::default()
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: Some(WorkflowStatus::Failed),
            error: Some(error),
            ..Self::default()
        }
    }
}

struct WorkflowEntry {
    record: Workflow,
    tasks: Vec<TaskHandle>,
}

/// In-memory registry of workflow records, held for the orchestrator's lifetime
#[derive(Default)]
pub struct WorkflowStateTracker {
    workflows: Mutex<HashMap<String, WorkflowEntry>>,
}

impl WorkflowStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending workflow and returns its initial snapshot
    pub async fn create(&self, id: &str, total_steps: u32) -> Workflow {
        let record = Workflow {
            id: id.to_string(),
            status: WorkflowStatus::Pending,
            current_step: 0,
            total_steps,
            task_ids: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        };
        self.workflows.lock().await.insert(
            id.to_string(),
            WorkflowEntry {
                record: record.clone(),
                tasks: Vec::new(),
            },
        );
        record
    }

    /// Merges the partial update into the workflow record. Once a workflow is
    /// terminal, further updates are ignored so a cancel and a stage failure
    /// cannot overwrite each other.
    pub async fn update(&self, id: &str, update: WorkflowUpdate) -> Result<Workflow, Error> {
        let mut workflows = self.workflows.lock().await;
        let entry = workflows
            .get_mut(id)
            .ok_or_else(|| Error::WorkflowNotFound(id.to_string()))?;

        if entry.record.status.is_terminal() {
            warn!(
                workflow = %id,
                status = %entry.record.status,
                "ignoring update of a terminal workflow"
            );
            return Ok(entry.record.clone());
        }

        if let Some(status) = update.status {
            entry.record.status = status;
        }
        if let Some(step) = update.current_step {
            entry.record.current_step = step;
        }
        if let Some(error) = update.error {
            entry.record.error = Some(error);
        }
        if entry.record.status.is_terminal() && entry.record.completed_at.is_none() {
            entry.record.completed_at = Some(Utc::now());
        }
        Ok(entry.record.clone())
    }

    /// Snapshots of every known workflow, for diagnostics
    pub async fn list(&self) -> Vec<Workflow> {
        self.workflows
            .lock()
            .await
            .values()
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Returns a cloned snapshot of the workflow, or `None` if unknown
    pub async fn get(&self, id: &str) -> Option<Workflow> {
        self.workflows
            .lock()
            .await
            .get(id)
            .map(|entry| entry.record.clone())
    }

    /// Records a task handle under the workflow so cancel and rollback can
    /// reach every owned task
    pub async fn attach_task(&self, id: &str, handle: TaskHandle) -> Result<(), Error> {
        let task_id = handle.lock().await.id.clone();
        let mut workflows = self.workflows.lock().await;
        let entry = workflows
            .get_mut(id)
            .ok_or_else(|| Error::WorkflowNotFound(id.to_string()))?;
        entry.record.task_ids.push(task_id);
        entry.tasks.push(handle);
        Ok(())
    }

    /// Handles of every task the workflow owns
    pub async fn owned_tasks(&self, id: &str) -> Vec<TaskHandle> {
        self.workflows
            .lock()
            .await
            .get(id)
            .map(|entry| entry.tasks.clone())
            .unwrap_or_default()
    }

    /// Force-fails every non-terminal owned task and marks the workflow
    /// cancelled. An already-started agent action is not preempted; its late
    /// result is discarded by the task's forward-only status guard.
    pub async fn cancel(&self, id: &str) -> Result<(), Error> {
        let mut workflows = self.workflows.lock().await;
        let entry = workflows
            .get_mut(id)
            .ok_or_else(|| Error::WorkflowNotFound(id.to_string()))?;

        if entry.record.status.is_terminal() {
            warn!(workflow = %id, "ignoring cancel of a terminal workflow");
            return Ok(());
        }

        for handle in &entry.tasks {
            let mut task = handle.lock().await;
            if !task.is_terminal() {
                task.fail("workflow cancelled");
            }
        }

        entry.record.status = WorkflowStatus::Cancelled;
        entry.record.completed_at = Some(Utc::now());
        info!(workflow = %id, "workflow cancelled");
        Ok(())
    }
}
