use super::StageOrchestrator;
use crate::core::task::TaskHandle;
use crate::core::task_status::TaskStatus;
use tracing::{debug, warn};

impl StageOrchestrator {
    /// Compensating cleanup after a stage failure: every non-terminal task the
    /// workflow owns is forced to failed, and every task that had already
    /// completed is handed to the best-effort cleanup hook. Never raises.
    pub(crate) async fn rollback(&self, workflow_id: &str) {
        let handles = self.tracker.owned_tasks(workflow_id).await;
        warn!(
            workflow = %workflow_id,
            owned_tasks = handles.len(),
            "rolling back workflow"
        );

        for handle in handles {
            let status = {
                let mut task = handle.lock().await;
                if !task.is_terminal() {
                    task.fail("rolled back after stage failure");
                    continue;
                }
                task.status
            };
            if status == TaskStatus::Completed {
                Self::cleanup_completed_task(&handle).await;
            }
        }
    }

    /// Hook for undoing the side effects of a task that completed before the
    /// pipeline failed. Currently a logged no-op; compensating actions plug in
    /// here.
    async fn cleanup_completed_task(handle: &TaskHandle) {
        let task = handle.lock().await;
        debug!(
            task_id = %task.id,
            task_type = %task.task_type,
            "cleanup hook invoked for completed task"
        );
    }
}
