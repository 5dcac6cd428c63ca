use super::{string_items, StageAgent, DRAFTER_AGENT};
use crate::core::TaskType;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Built-in drafting agent.
///
/// Expands a chapter outline into deterministic placeholder narrative, so the
/// pipeline runs end-to-end without a generation backend. A real backend
/// replaces this by registering its own agent under the same tag.
pub struct DrafterAgent;

#[async_trait]
impl StageAgent for DrafterAgent {
    fn name(&self) -> &str {
        DRAFTER_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        if task_type != TaskType::ChapterDraft {
            return Err(format!("drafter cannot handle '{}' tasks", task_type));
        }

        let title = input
            .pointer("/chapter/title")
            .and_then(Value::as_str)
            .ok_or("draft input is missing chapter.title")?;
        let subject = input.get("subject").and_then(Value::as_str).unwrap_or("");
        let level = input.get("level").and_then(Value::as_str).unwrap_or("");
        let topics = string_items(input.pointer("/chapter/topics"));
        let objectives = string_items(input.pointer("/chapter/learning_objectives"));

        debug!(chapter = title, "drafting chapter content");

        let mut content = String::new();
        content.push_str(&format!(
            "{} opens the {} treatment of {}.\n\n",
            title, level, subject
        ));
        for topic in &topics {
            content.push_str(&format!(
                "The section on {} develops the idea step by step, grounding each \
                 concept in a worked example before generalizing it.\n\n",
                topic
            ));
        }
        if !objectives.is_empty() {
            content.push_str("By the end of this chapter the reader can ");
            content.push_str(&objectives.join(", and "));
            content.push_str(".\n");
        }

        Ok(json!({ "content": content.trim_end() }))
    }
}
