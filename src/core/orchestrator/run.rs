use super::stages::{self, PipelineStage};
use super::StageOrchestrator;
use crate::config::OutlineConfig;
use crate::constants::TOTAL_PIPELINE_STEPS;
use crate::core::document::CompositeDocument;
use crate::core::workflow::{WorkflowStatus, WorkflowUpdate};
use crate::errors::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

impl StageOrchestrator {
    /// Runs the seven-stage pipeline that turns the outline into a finished
    /// book.
    ///
    /// A workflow record is created up front and stays queryable through
    /// [`StageOrchestrator::get_workflow_state`] after the run, whatever the
    /// outcome. On any stage failure the workflow is marked failed, every
    /// owned task is driven to a terminal state by rollback, and the original
    /// error is returned.
    ///
    /// # Arguments
    ///
    /// * `topic` - Short label for the run, used in logs
    /// * `outline` - The structured outline to generate from
    pub async fn start_pipeline(
        &self,
        topic: &str,
        outline: &OutlineConfig,
    ) -> Result<CompositeDocument, Error> {
        let workflow_id = Uuid::new_v4().to_string();
        self.tracker.create(&workflow_id, TOTAL_PIPELINE_STEPS).await;
        self.tracker
            .update(&workflow_id, WorkflowUpdate::status(WorkflowStatus::Running))
            .await?;
        info!(workflow = %workflow_id, topic, "starting book generation pipeline");

        match self.drive_pipeline(&workflow_id, outline).await {
            Ok(document) => {
                if let Err(e) = self
                    .tracker
                    .update(
                        &workflow_id,
                        WorkflowUpdate::status(WorkflowStatus::Completed),
                    )
                    .await
                {
                    warn!(workflow = %workflow_id, "could not record completion: {}", e);
                }
                self.finish_progress();
                info!(
                    workflow = %workflow_id,
                    chapters = document.chapters.len(),
                    "pipeline completed"
                );
                Ok(document)
            }
            Err(err) => {
                error!(workflow = %workflow_id, "pipeline failed: {}", err);
                if let Err(e) = self
                    .tracker
                    .update(&workflow_id, WorkflowUpdate::failed(err.to_string()))
                    .await
                {
                    warn!(workflow = %workflow_id, "could not record failure: {}", e);
                }
                self.rollback(&workflow_id).await;
                self.finish_progress();
                Err(err)
            }
        }
    }

    async fn drive_pipeline(
        &self,
        workflow_id: &str,
        outline: &OutlineConfig,
    ) -> Result<CompositeDocument, Error> {
        // Stage 1: an empty document carrying the outline's metadata.
        self.report(&format!("Stage 1/7: initializing '{}'", outline.title));
        let mut document = CompositeDocument::from_outline(outline);
        self.advance(workflow_id, PipelineStage::Initialize).await?;

        // Stage 2: draft every chapter concurrently on the high queue.
        self.report(&format!(
            "Stage 2/7: drafting {} chapters",
            outline.chapters.len()
        ));
        let batch = self
            .enqueue_batch(workflow_id, stages::draft_tasks(outline, &document))
            .await?;
        let tasks = self.wait_for_batch(PipelineStage::Draft, &batch).await?;
        stages::fold_draft_outputs(&mut document, &tasks)?;
        self.advance(workflow_id, PipelineStage::Draft).await?;

        // Stage 3: exercises and summaries.
        self.report("Stage 3/7: enhancing chapters");
        let batch = self
            .enqueue_batch(workflow_id, stages::enhance_tasks(outline, &document))
            .await?;
        let tasks = self.wait_for_batch(PipelineStage::Enhance, &batch).await?;
        stages::fold_enhance_outputs(&mut document, &tasks)?;
        self.advance(workflow_id, PipelineStage::Enhance).await?;

        // Stage 4: formatted content and diagrams.
        self.report("Stage 4/7: formatting chapters");
        let batch = self
            .enqueue_batch(workflow_id, stages::format_tasks(&document))
            .await?;
        let tasks = self.wait_for_batch(PipelineStage::Format, &batch).await?;
        stages::fold_format_outputs(&mut document, &tasks)?;
        self.advance(workflow_id, PipelineStage::Format).await?;

        // Stage 5: one fact-checking pass over the whole book.
        self.report("Stage 5/7: fact-checking");
        let batch = self
            .enqueue_batch(workflow_id, stages::fact_check_task(outline, &document))
            .await?;
        let tasks = self.wait_for_batch(PipelineStage::FactCheck, &batch).await?;
        stages::fold_fact_check_output(&mut document, &tasks[0])?;
        self.advance(workflow_id, PipelineStage::FactCheck).await?;

        // Stage 6: the quality verdict. A negative verdict aborts here.
        self.report("Stage 6/7: validating quality and alignment");
        let batch = self
            .enqueue_batch(workflow_id, stages::validate_task(outline, &document))
            .await?;
        let tasks = self.wait_for_batch(PipelineStage::Validate, &batch).await?;
        stages::fold_validation_output(&mut document, &tasks[0])?;
        self.advance(workflow_id, PipelineStage::Validate).await?;

        // Stage 7: index building, then the integrity digest.
        self.report("Stage 7/7: building indexes");
        let batch = self
            .enqueue_batch(workflow_id, stages::index_tasks(&document))
            .await?;
        let tasks = self.wait_for_batch(PipelineStage::Index, &batch).await?;
        stages::log_index_outputs(&tasks);
        document.integrity_hash = Some(document.compute_integrity_hash()?);
        self.advance(workflow_id, PipelineStage::Index).await?;

        Ok(document)
    }
}
