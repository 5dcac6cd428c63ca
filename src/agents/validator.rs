use super::{StageAgent, VALIDATOR_AGENT};
use crate::core::TaskType;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Built-in validation agent.
///
/// Scores the assembled book deterministically: quality from chapter
/// completeness and depth, alignment from exercise and summary coverage. The
/// verdict fails when any chapter is missing content, exercises or summaries.
pub struct ValidatorAgent;

#[async_trait]
impl StageAgent for ValidatorAgent {
    fn name(&self) -> &str {
        VALIDATOR_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        if task_type != TaskType::QualityValidate {
            return Err(format!("validator cannot handle '{}' tasks", task_type));
        }

        let chapters = input
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or("validate input is missing chapters")?;
        if chapters.is_empty() {
            return Ok(json!({
                "passed": false,
                "quality_score": 0.0,
                "alignment_score": 0.0,
                "issues": ["the book has no chapters"],
            }));
        }

        let mut issues = Vec::new();
        let mut total_words = 0usize;
        let mut covered = 0usize;

        for chapter in chapters {
            let title = chapter.get("title").and_then(Value::as_str).unwrap_or("?");
            let words = chapter
                .get("content")
                .and_then(Value::as_str)
                .map(|c| c.split_whitespace().count())
                .unwrap_or(0);
            total_words += words;
            if words == 0 {
                issues.push(format!("chapter '{}' has no content", title));
            }

            let has_exercises = chapter
                .get("exercises")
                .and_then(Value::as_array)
                .map(|e| !e.is_empty())
                .unwrap_or(false);
            let has_summaries = chapter
                .get("summaries")
                .and_then(Value::as_array)
                .map(|s| !s.is_empty())
                .unwrap_or(false);
            if !has_exercises {
                issues.push(format!("chapter '{}' has no exercises", title));
            }
            if !has_summaries {
                issues.push(format!("chapter '{}' has no summaries", title));
            }
            if has_exercises && has_summaries {
                covered += 1;
            }
        }

        let avg_words = total_words as f64 / chapters.len() as f64;
        let depth = (avg_words / 150.0).min(1.0);
        let completeness = chapters
            .iter()
            .filter(|c| {
                c.get("content")
                    .and_then(Value::as_str)
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false)
            })
            .count() as f64
            / chapters.len() as f64;
        let quality_score = 0.5 * completeness + 0.5 * depth;
        let alignment_score = covered as f64 / chapters.len() as f64;

        Ok(json!({
            "passed": issues.is_empty(),
            "quality_score": quality_score,
            "alignment_score": alignment_score,
            "issues": issues,
        }))
    }
}
