use super::{string_items, StageAgent, ENHANCER_AGENT};
use crate::core::TaskType;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Built-in enhancement agent.
///
/// Derives exercises from the chapter's learning objectives and summaries
/// from its topics. Always produces at least one of each, so a validated book
/// never carries a bare chapter.
pub struct EnhancerAgent;

#[async_trait]
impl StageAgent for EnhancerAgent {
    fn name(&self) -> &str {
        ENHANCER_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        if task_type != TaskType::ChapterEnhance {
            return Err(format!("enhancer cannot handle '{}' tasks", task_type));
        }

        let title = input
            .get("title")
            .and_then(Value::as_str)
            .ok_or("enhance input is missing title")?;
        let topics = string_items(input.get("topics"));
        let objectives = string_items(input.get("learning_objectives"));

        let mut exercises: Vec<String> = objectives
            .iter()
            .enumerate()
            .map(|(i, objective)| {
                format!("Exercise {}: demonstrate that you can {}.", i + 1, objective)
            })
            .collect();
        if exercises.is_empty() {
            exercises.push(format!(
                "Exercise 1: restate the main argument of '{}' in your own words.",
                title
            ));
        }

        let mut summaries: Vec<String> = topics
            .iter()
            .map(|topic| format!("{} revisits {} and ties it back to the chapter theme.", title, topic))
            .collect();
        summaries.push(format!("'{}' in one paragraph: the chapter's throughline.", title));

        Ok(json!({ "exercises": exercises, "summaries": summaries }))
    }
}
