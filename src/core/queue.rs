use super::retry::{RetryExecutor, RetryPolicy};
use super::task::{Task, TaskHandle};
use super::task_status::TaskStatus;
use crate::agents::AgentRegistry;
use crate::config::QueueSettings;
use crate::constants::{
    HIGH_QUEUE_CONCURRENCY, LOW_QUEUE_CONCURRENCY, NORMAL_QUEUE_CONCURRENCY,
};
use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Priority class a task is enqueued under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    High,
    Normal,
    Low,
}

impl QueuePriority {
    /// Stable identifier of the backing queue
    pub fn queue_id(&self) -> &'static str {
        match self {
            QueuePriority::High => "high",
            QueuePriority::Normal => "normal",
            QueuePriority::Low => "low",
        }
    }

    /// Rank of the priority class, lower is more urgent
    pub fn rank(&self) -> u8 {
        match self {
            QueuePriority::High => 0,
            QueuePriority::Normal => 1,
            QueuePriority::Low => 2,
        }
    }

    fn default_concurrency(&self) -> usize {
        match self {
            QueuePriority::High => HIGH_QUEUE_CONCURRENCY,
            QueuePriority::Normal => NORMAL_QUEUE_CONCURRENCY,
            QueuePriority::Low => LOW_QUEUE_CONCURRENCY,
        }
    }
}

impl fmt::Display for QueuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.queue_id())
    }
}

/// Resolved settings one queue is built from
#[derive(Debug, Clone)]
pub struct QueueTuning {
    pub priority: QueuePriority,
    pub max_concurrency: usize,
    pub retry_policy: RetryPolicy,
}

impl QueueTuning {
    /// Builds the tuning for one priority class from its optional overrides
    pub fn from_settings(
        priority: QueuePriority,
        settings: Option<&QueueSettings>,
    ) -> Result<Self, Error> {
        Ok(Self {
            priority,
            max_concurrency: settings
                .and_then(|s| s.max_concurrency)
                .unwrap_or_else(|| priority.default_concurrency())
                .max(1),
            retry_policy: RetryPolicy::from_settings(settings.and_then(|s| s.retry.as_ref()))?,
        })
    }
}

/// One priority class holding tasks, with a concurrency ceiling and a retry policy
#[derive(Debug)]
pub struct TaskQueue {
    pub id: &'static str,
    pub priority: QueuePriority,
    pub max_concurrency: usize,
    pub retry_policy: RetryPolicy,
    tasks: Mutex<Vec<TaskHandle>>,
}

impl TaskQueue {
    fn new(tuning: QueueTuning) -> Self {
        Self {
            id: tuning.priority.queue_id(),
            priority: tuning.priority,
            max_concurrency: tuning.max_concurrency,
            retry_policy: tuning.retry_policy,
            tasks: Mutex::new(Vec::new()),
        }
    }
}

/// Admits tasks into priority queues and dispatches them up to each queue's
/// concurrency ceiling
pub struct TaskQueueManager {
    queues: HashMap<&'static str, Arc<TaskQueue>>,
    registry: Arc<AgentRegistry>,
}

impl TaskQueueManager {
    /// Creates a manager with the three standard queues tuned by `tunings`
    pub fn new(registry: Arc<AgentRegistry>, tunings: Vec<QueueTuning>) -> Self {
        let queues = tunings
            .into_iter()
            .map(|tuning| {
                let queue = TaskQueue::new(tuning);
                (queue.id, Arc::new(queue))
            })
            .collect();
        Self { queues, registry }
    }

    /// Appends the task to the named queue and opportunistically starts
    /// execution. Returns the shared handle through which the caller observes
    /// the task; the eventual outcome is visible only on the task itself,
    /// never as an error here.
    pub async fn enqueue(self: &Arc<Self>, task: Task, priority: QueuePriority) -> TaskHandle {
        let handle = task.into_handle();
        if let Some(queue) = self.queues.get(priority.queue_id()) {
            queue.tasks.lock().await.push(Arc::clone(&handle));
        } else {
            error!(queue = %priority, "no queue registered for priority, task will never run");
        }
        self.dispatch(priority).await;
        handle
    }

    /// Starts pending tasks of the queue in FIFO order until the concurrency
    /// ceiling is reached. Each started task runs detached; its failure is
    /// logged and reflected on its status, and completion re-invokes dispatch
    /// so waiting tasks start.
    pub fn dispatch<'a>(
        self: &'a Arc<Self>,
        priority: QueuePriority,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        let this = Arc::clone(self);
        Box::pin(async move {
            let Some(queue) = this.queues.get(priority.queue_id()) else {
                return;
            };

            let mut to_start = Vec::new();
            {
                let tasks = queue.tasks.lock().await;
                let mut running = 0usize;
                let mut pending = Vec::new();
                for handle in tasks.iter() {
                    match handle.lock().await.status {
                        TaskStatus::InProgress => running += 1,
                        TaskStatus::Pending => pending.push(Arc::clone(handle)),
                        _ => {}
                    }
                }

                if running >= queue.max_concurrency {
                    return;
                }

                // Claim the slots under the queue lock so a concurrent dispatch
                // cannot double-start the same task.
                for handle in pending.into_iter().take(queue.max_concurrency - running) {
                    handle.lock().await.mark_in_progress();
                    to_start.push(handle);
                }
            }

            for handle in to_start {
                let manager = Arc::clone(&this);
                let registry = Arc::clone(&this.registry);
                let policy = queue.retry_policy.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        RetryExecutor::execute(&handle, &policy, registry.as_ref()).await
                    {
                        error!("detached task execution failed: {}", e);
                    }
                    manager.dispatch(priority).await;
                });
            }
            debug!(queue = %priority, "dispatch pass finished");
        })
    }
}
