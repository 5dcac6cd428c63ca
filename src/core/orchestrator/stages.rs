use crate::agents::{
    DRAFTER_AGENT, ENHANCER_AGENT, FACT_CHECKER_AGENT, FORMATTER_AGENT, INDEXER_AGENT,
    VALIDATOR_AGENT,
};
use crate::config::OutlineConfig;
use crate::core::document::{Chapter, CompositeDocument};
use crate::core::queue::QueuePriority;
use crate::core::task::{Task, TaskType};
use crate::errors::Error;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

/// One of the seven ordered phases that together produce the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Initialize,
    Draft,
    Enhance,
    Format,
    FactCheck,
    Validate,
    Index,
}

impl PipelineStage {
    /// 1-based position of the stage in the pipeline
    pub fn step(&self) -> u32 {
        match self {
            PipelineStage::Initialize => 1,
            PipelineStage::Draft => 2,
            PipelineStage::Enhance => 3,
            PipelineStage::Format => 4,
            PipelineStage::FactCheck => 5,
            PipelineStage::Validate => 6,
            PipelineStage::Index => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Initialize => "initialize",
            PipelineStage::Draft => "draft",
            PipelineStage::Enhance => "enhance",
            PipelineStage::Format => "format",
            PipelineStage::FactCheck => "fact-check",
            PipelineStage::Validate => "validate",
            PipelineStage::Index => "index",
        }
    }
}

/// One high-priority drafting task per outline chapter
pub fn draft_tasks(
    outline: &OutlineConfig,
    document: &CompositeDocument,
) -> Vec<(Task, QueuePriority)> {
    outline
        .chapters
        .iter()
        .map(|chapter| {
            let input = json!({
                "chapter": {
                    "title": chapter.title,
                    "order_index": chapter.order_index,
                    "topics": chapter.topics,
                    "learning_objectives": chapter.learning_objectives,
                },
                "subject": document.subject,
                "level": document.level,
            });
            (
                Task::new(DRAFTER_AGENT, TaskType::ChapterDraft, input),
                QueuePriority::High,
            )
        })
        .collect()
}

/// One normal-priority enhancement task per drafted chapter
pub fn enhance_tasks(
    outline: &OutlineConfig,
    document: &CompositeDocument,
) -> Vec<(Task, QueuePriority)> {
    document
        .chapters
        .iter()
        .map(|chapter| {
            let outline_chapter = outline
                .chapters
                .iter()
                .find(|c| c.order_index == chapter.order_index);
            let input = json!({
                "chapter_id": chapter.id,
                "title": chapter.title,
                "content": chapter.content,
                "topics": outline_chapter.map(|c| c.topics.clone()).unwrap_or_default(),
                "learning_objectives": outline_chapter
                    .map(|c| c.learning_objectives.clone())
                    .unwrap_or_default(),
                "subject": document.subject,
            });
            (
                Task::new(ENHANCER_AGENT, TaskType::ChapterEnhance, input),
                QueuePriority::Normal,
            )
        })
        .collect()
}

/// One normal-priority formatting task per chapter
pub fn format_tasks(document: &CompositeDocument) -> Vec<(Task, QueuePriority)> {
    document
        .chapters
        .iter()
        .map(|chapter| {
            let input = json!({
                "chapter_id": chapter.id,
                "title": chapter.title,
                "order_index": chapter.order_index,
                "content": chapter.content,
            });
            (
                Task::new(FORMATTER_AGENT, TaskType::ChapterFormat, input),
                QueuePriority::Normal,
            )
        })
        .collect()
}

/// A single high-priority fact-checking task covering all chapters
pub fn fact_check_task(
    outline: &OutlineConfig,
    document: &CompositeDocument,
) -> Vec<(Task, QueuePriority)> {
    let input = json!({
        "subject": document.subject,
        "reference": outline.reference,
        "chapters": document
            .chapters
            .iter()
            .map(|c| json!({"id": c.id, "title": c.title, "content": c.content}))
            .collect::<Vec<_>>(),
    });
    vec![(
        Task::new(FACT_CHECKER_AGENT, TaskType::FactCheck, input),
        QueuePriority::High,
    )]
}

/// A single high-priority validation task over the whole book
pub fn validate_task(
    outline: &OutlineConfig,
    document: &CompositeDocument,
) -> Vec<(Task, QueuePriority)> {
    let objectives: Vec<&str> = outline
        .chapters
        .iter()
        .flat_map(|c| c.learning_objectives.iter().map(String::as_str))
        .collect();
    let input = json!({
        "title": document.title,
        "subject": document.subject,
        "level": document.level,
        "objectives": objectives,
        "chapters": document
            .chapters
            .iter()
            .map(|c| json!({
                "id": c.id,
                "title": c.title,
                "content": c.content,
                "exercises": c.exercises,
                "summaries": c.summaries,
            }))
            .collect::<Vec<_>>(),
    });
    vec![(
        Task::new(VALIDATOR_AGENT, TaskType::QualityValidate, input),
        QueuePriority::High,
    )]
}

/// The two low-priority indexing tasks run by the final stage
pub fn index_tasks(document: &CompositeDocument) -> Vec<(Task, QueuePriority)> {
    let chapters: Vec<Value> = document
        .chapters
        .iter()
        .map(|c| json!({"id": c.id, "content": c.content}))
        .collect();
    vec![
        (
            Task::new(
                INDEXER_AGENT,
                TaskType::EmbeddingIndex,
                json!({"chapters": chapters}),
            ),
            QueuePriority::Low,
        ),
        (
            Task::new(
                INDEXER_AGENT,
                TaskType::KnowledgeGraph,
                json!({"chapters": chapters}),
            ),
            QueuePriority::Low,
        ),
    ]
}

/// Materializes the chapters from the drafting outputs, ordered by the
/// outline's order_index
pub fn fold_draft_outputs(
    document: &mut CompositeDocument,
    tasks: &[Task],
) -> Result<(), Error> {
    let mut chapters = Vec::with_capacity(tasks.len());
    for task in tasks {
        let order_index = task
            .input
            .pointer("/chapter/order_index")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed(task, "input is missing chapter.order_index"))?;
        let title = task
            .input
            .pointer("/chapter/title")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(task, "input is missing chapter.title"))?;
        let content = output_field_str(task, "content")?;

        chapters.push(Chapter {
            id: Uuid::new_v4().to_string(),
            order_index: order_index as u32,
            title: title.to_string(),
            content,
            diagrams: Vec::new(),
            references: Vec::new(),
            summaries: Vec::new(),
            exercises: Vec::new(),
        });
    }
    chapters.sort_by_key(|c| c.order_index);
    document.chapters = chapters;
    Ok(())
}

/// Attaches exercises and summaries to the chapters they were produced for
pub fn fold_enhance_outputs(
    document: &mut CompositeDocument,
    tasks: &[Task],
) -> Result<(), Error> {
    for task in tasks {
        let chapter_id = input_field_str(task, "chapter_id")?;
        let exercises = output_field_str_list(task, "exercises")?;
        let summaries = output_field_str_list(task, "summaries")?;
        let chapter = document
            .chapter_mut(&chapter_id)
            .ok_or_else(|| malformed(task, "references an unknown chapter"))?;
        chapter.exercises = exercises;
        chapter.summaries = summaries;
    }
    Ok(())
}

/// Replaces chapter content with its formatted form and attaches diagrams
pub fn fold_format_outputs(
    document: &mut CompositeDocument,
    tasks: &[Task],
) -> Result<(), Error> {
    for task in tasks {
        let chapter_id = input_field_str(task, "chapter_id")?;
        let content = output_field_str(task, "formatted_content")?;
        let diagrams = output_field_str_list(task, "diagrams").unwrap_or_default();
        let chapter = document
            .chapter_mut(&chapter_id)
            .ok_or_else(|| malformed(task, "references an unknown chapter"))?;
        chapter.content = content;
        chapter.diagrams = diagrams;
    }
    Ok(())
}

/// Attaches the fact-checker's references to each chapter
pub fn fold_fact_check_output(
    document: &mut CompositeDocument,
    task: &Task,
) -> Result<(), Error> {
    let output = output_of(task)?;
    let references = output
        .get("references")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(task, "output is missing the references map"))?;

    for chapter in &mut document.chapters {
        match references.get(&chapter.id) {
            Some(refs) => {
                chapter.references = string_list(refs);
            }
            None => {
                debug!(chapter_id = %chapter.id, "fact-checker returned no references for chapter");
            }
        }
    }
    Ok(())
}

/// Applies the validation verdict, or aborts the pipeline when it is negative
pub fn fold_validation_output(
    document: &mut CompositeDocument,
    task: &Task,
) -> Result<(), Error> {
    let output = output_of(task)?;
    let passed = output
        .get("passed")
        .and_then(Value::as_bool)
        .ok_or_else(|| malformed(task, "output is missing the passed flag"))?;

    if !passed {
        let issues = output
            .get("issues")
            .map(string_list)
            .unwrap_or_default();
        let reason = if issues.is_empty() {
            "the quality verdict was negative".to_string()
        } else {
            issues.join("; ")
        };
        return Err(Error::ValidationFailed(reason));
    }

    document.metadata.quality_score = output
        .get("quality_score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    document.metadata.alignment_score = output
        .get("alignment_score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    document.metadata.last_validated = Some(Utc::now());
    Ok(())
}

/// Logs what the indexing tasks produced; their outputs are not folded into
/// the book itself
pub fn log_index_outputs(tasks: &[Task]) {
    for task in tasks {
        if let Some(output) = &task.output {
            info!(task_type = %task.task_type, %output, "index task finished");
        }
    }
}

fn malformed(task: &Task, reason: &str) -> Error {
    Error::MalformedOutput {
        task_id: task.id.clone(),
        reason: reason.to_string(),
    }
}

fn output_of(task: &Task) -> Result<&Value, Error> {
    task.output
        .as_ref()
        .ok_or_else(|| malformed(task, "completed without an output payload"))
}

fn input_field_str(task: &Task, key: &str) -> Result<String, Error> {
    task.input
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(task, &format!("input is missing '{}'", key)))
}

fn output_field_str(task: &Task, key: &str) -> Result<String, Error> {
    output_of(task)?
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(task, &format!("output is missing '{}'", key)))
}

fn output_field_str_list(task: &Task, key: &str) -> Result<Vec<String>, Error> {
    let value = output_of(task)?
        .get(key)
        .ok_or_else(|| malformed(task, &format!("output is missing '{}'", key)))?;
    Ok(string_list(value))
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
