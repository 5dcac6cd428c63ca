use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid outline: {0}")]
    OutlineInvalid(String),
    #[error("invalid duration '{value}' for '{field}'")]
    InvalidDuration { field: &'static str, value: String },
    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),
    #[error("task '{task_id}' failed after {attempts} attempts: {reason}")]
    TaskExecutionFailed {
        task_id: String,
        attempts: u32,
        reason: String,
    },
    #[error("stage '{stage}' failed, task(s) [{task_ids}] did not complete")]
    StageFailed {
        stage: &'static str,
        task_ids: String,
    },
    #[error(
        "stage '{stage}' timed out after {}s, still waiting on task(s) [{task_ids}]",
        ceiling.as_secs()
    )]
    StageTimedOut {
        stage: &'static str,
        ceiling: Duration,
        task_ids: String,
    },
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("task '{task_id}' returned malformed output: {reason}")]
    MalformedOutput { task_id: String, reason: String },
}
