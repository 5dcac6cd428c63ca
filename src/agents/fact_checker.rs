use super::{StageAgent, FACT_CHECKER_AGENT};
use crate::core::TaskType;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Built-in fact-checking agent: attributes every chapter to the configured
/// reference material, or to a subject primer when none is given.
pub struct FactCheckerAgent;

#[async_trait]
impl StageAgent for FactCheckerAgent {
    fn name(&self) -> &str {
        FACT_CHECKER_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        if task_type != TaskType::FactCheck {
            return Err(format!("fact-checker cannot handle '{}' tasks", task_type));
        }

        let subject = input.get("subject").and_then(Value::as_str).unwrap_or("");
        let reference = input.get("reference").and_then(Value::as_str);
        let chapters = input
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or("fact-check input is missing chapters")?;

        let mut references = Map::new();
        for (i, chapter) in chapters.iter().enumerate() {
            let id = chapter
                .get("id")
                .and_then(Value::as_str)
                .ok_or("fact-check input chapter is missing id")?;
            let title = chapter.get("title").and_then(Value::as_str).unwrap_or("");

            let mut refs = Vec::new();
            match reference {
                Some(reference) => refs.push(format!("{}, section {}", reference, i + 1)),
                None => refs.push(format!("{} primer, notes on '{}'", subject, title)),
            }
            references.insert(id.to_string(), json!(refs));
        }

        Ok(json!({ "references": references }))
    }
}
