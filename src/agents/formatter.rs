use super::{StageAgent, FORMATTER_AGENT};
use crate::core::TaskType;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Built-in formatting agent: renders the chapter as markdown and attaches a
/// concept-map diagram description.
pub struct FormatterAgent;

#[async_trait]
impl StageAgent for FormatterAgent {
    fn name(&self) -> &str {
        FORMATTER_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        if task_type != TaskType::ChapterFormat {
            return Err(format!("formatter cannot handle '{}' tasks", task_type));
        }

        let title = input
            .get("title")
            .and_then(Value::as_str)
            .ok_or("format input is missing title")?;
        let order_index = input
            .get("order_index")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let content = input
            .get("content")
            .and_then(Value::as_str)
            .ok_or("format input is missing content")?;

        let formatted = format!("# Chapter {}: {}\n\n{}", order_index + 1, title, content);
        let diagrams = vec![format!("Concept map: how the sections of '{}' connect", title)];

        Ok(json!({ "formatted_content": formatted, "diagrams": diagrams }))
    }
}
