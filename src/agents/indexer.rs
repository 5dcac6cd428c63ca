use super::{StageAgent, INDEXER_AGENT};
use crate::core::TaskType;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Built-in indexing agent, covering both index-building task kinds: it
/// counts paragraph chunks for the embedding index and derives a simple
/// chapter/chunk graph for the knowledge graph.
pub struct IndexerAgent;

#[async_trait]
impl StageAgent for IndexerAgent {
    fn name(&self) -> &str {
        INDEXER_AGENT
    }

    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String> {
        let chapters = input
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or("index input is missing chapters")?;

        let chunks: usize = chapters
            .iter()
            .filter_map(|c| c.get("content").and_then(Value::as_str))
            .map(|content| content.split("\n\n").filter(|p| !p.trim().is_empty()).count())
            .sum();

        match task_type {
            TaskType::EmbeddingIndex => Ok(json!({ "embedded_chunks": chunks })),
            TaskType::KnowledgeGraph => {
                let nodes = chapters.len() + chunks;
                let edges = nodes.saturating_sub(1);
                Ok(json!({ "nodes": nodes, "edges": edges }))
            }
            other => Err(format!("indexer cannot handle '{}' tasks", other)),
        }
    }
}
