use super::stages::PipelineStage;
use super::StageOrchestrator;
use crate::core::task::{Task, TaskHandle};
use crate::core::task_status::TaskStatus;
use crate::errors::Error;
use crate::utils::join_task_ids;
use tokio::time::{sleep, Instant};

impl StageOrchestrator {
    /// Polls the batch at the configured interval until every task is
    /// terminal, then returns their snapshots.
    ///
    /// # Errors
    ///
    /// * `Error::StageFailed` if any task in the batch ended failed
    /// * `Error::StageTimedOut` if the wait ceiling elapsed first, naming the
    ///   still-non-terminal task ids
    pub(crate) async fn wait_for_batch(
        &self,
        stage: PipelineStage,
        handles: &[TaskHandle],
    ) -> Result<Vec<Task>, Error> {
        let deadline = Instant::now() + self.settings.stage_timeout;

        loop {
            let mut snapshots = Vec::with_capacity(handles.len());
            for handle in handles {
                snapshots.push(handle.lock().await.clone());
            }

            if snapshots.iter().all(Task::is_terminal) {
                let failed: Vec<&str> = snapshots
                    .iter()
                    .filter(|t| t.status == TaskStatus::Failed)
                    .map(|t| t.id.as_str())
                    .collect();
                if !failed.is_empty() {
                    return Err(Error::StageFailed {
                        stage: stage.name(),
                        task_ids: join_task_ids(&failed),
                    });
                }
                return Ok(snapshots);
            }

            if Instant::now() >= deadline {
                let stuck: Vec<&str> = snapshots
                    .iter()
                    .filter(|t| !t.is_terminal())
                    .map(|t| t.id.as_str())
                    .collect();
                return Err(Error::StageTimedOut {
                    stage: stage.name(),
                    ceiling: self.settings.stage_timeout,
                    task_ids: join_task_ids(&stuck),
                });
            }

            sleep(self.settings.poll_interval).await;
        }
    }
}
