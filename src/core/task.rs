use super::task_status::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Shared handle through which a task's status is observed and mutated.
/// Task locks are leaves: they are never held across another lock or any
/// agent work.
pub type TaskHandle = Arc<tokio::sync::Mutex<Task>>;

/// Kind of work a task carries through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Produce the narrative content of one chapter
    ChapterDraft,
    /// Add exercises and summaries to one chapter
    ChapterEnhance,
    /// Produce formatted content and diagrams for one chapter
    ChapterFormat,
    /// Attach references across all chapters
    FactCheck,
    /// Produce the quality/alignment verdict for the whole book
    QualityValidate,
    /// Build the embedding index over the final content
    EmbeddingIndex,
    /// Build the knowledge graph over the final content
    KnowledgeGraph,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskType::ChapterDraft => "chapter-draft",
            TaskType::ChapterEnhance => "chapter-enhance",
            TaskType::ChapterFormat => "chapter-format",
            TaskType::FactCheck => "fact-check",
            TaskType::QualityValidate => "quality-validate",
            TaskType::EmbeddingIndex => "embedding-index",
            TaskType::KnowledgeGraph => "knowledge-graph",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for TaskType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chapter-draft" => Ok(TaskType::ChapterDraft),
            "chapter-enhance" => Ok(TaskType::ChapterEnhance),
            "chapter-format" => Ok(TaskType::ChapterFormat),
            "fact-check" => Ok(TaskType::FactCheck),
            "quality-validate" => Ok(TaskType::QualityValidate),
            "embedding-index" => Ok(TaskType::EmbeddingIndex),
            "knowledge-graph" => Ok(TaskType::KnowledgeGraph),
            _ => Err(()),
        }
    }
}

/// One unit of work submitted to a queue
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// Unique identifier of the task
    pub id: String,
    /// Name of the agent that executes the task
    pub agent: String,
    /// Kind of work the task carries
    pub task_type: TaskType,
    /// Input payload handed to the agent
    pub input: Value,
    /// Output payload, absent until the task completes
    pub output: Option<Value>,
    /// Current status of the task
    pub status: TaskStatus,
    /// Reason for failure, if the task failed
    pub error: Option<String>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new pending task for the given agent
    pub fn new(agent: &str, task_type: TaskType, input: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent: agent.to_string(),
            task_type,
            input,
            output: None,
            status: TaskStatus::Pending,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Wraps the task in the shared handle used by queues and the tracker
    pub fn into_handle(self) -> TaskHandle {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Moves the task to in-progress. A no-op once the task is terminal or
    /// already running, so a late dispatch cannot rewind the status.
    pub fn mark_in_progress(&mut self) {
        if self.status == TaskStatus::Pending {
            self.status = TaskStatus::InProgress;
        }
    }

    /// Records a successful result. Ignored if the task is already terminal,
    /// which discards late completions of force-failed tasks.
    pub fn complete(&mut self, output: Value) {
        if self.status.is_terminal() {
            debug!(task_id = %self.id, "discarding completion of a terminal task");
            return;
        }
        self.output = Some(output);
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Records a permanent failure. Ignored if the task is already terminal.
    pub fn fail(&mut self, reason: &str) {
        if self.status.is_terminal() {
            debug!(task_id = %self.id, "discarding failure of a terminal task");
            return;
        }
        self.error = Some(reason.to_string());
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Whether the task has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_only_moves_forward() {
        let mut task = Task::new("drafter", TaskType::ChapterDraft, json!({}));
        assert_eq!(task.status, TaskStatus::Pending);

        task.mark_in_progress();
        assert_eq!(task.status, TaskStatus::InProgress);

        task.complete(json!({"content": "text"}));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());

        // A terminal task never rewinds or flips.
        task.fail("too late");
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.error.is_none());
    }

    #[test]
    fn failed_task_keeps_its_reason() {
        let mut task = Task::new("drafter", TaskType::ChapterDraft, json!({}));
        task.mark_in_progress();
        task.fail("agent unreachable");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("agent unreachable"));
        assert!(task.output.is_none());

        task.complete(json!({"content": "late"}));
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.output.is_none());
    }

    #[test]
    fn pending_task_can_be_force_failed() {
        let mut task = Task::new("indexer", TaskType::EmbeddingIndex, json!({}));
        task.fail("workflow cancelled");
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.completed_at.is_some());
    }
}
