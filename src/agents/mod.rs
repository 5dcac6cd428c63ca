mod agent_registry;
mod drafter;
mod enhancer;
mod fact_checker;
mod formatter;
mod indexer;
mod validator;

pub use agent_registry::*;
pub use drafter::*;
pub use enhancer::*;
pub use fact_checker::*;
pub use formatter::*;
pub use indexer::*;
pub use validator::*;

use crate::core::TaskType;
use serde_json::Value;

/// Agent tag the drafting tasks are addressed to
pub const DRAFTER_AGENT: &str = "drafter";
/// Agent tag the enhancement tasks are addressed to
pub const ENHANCER_AGENT: &str = "enhancer";
/// Agent tag the formatting tasks are addressed to
pub const FORMATTER_AGENT: &str = "formatter";
/// Agent tag the fact-checking task is addressed to
pub const FACT_CHECKER_AGENT: &str = "fact-checker";
/// Agent tag the validation task is addressed to
pub const VALIDATOR_AGENT: &str = "validator";
/// Agent tag the indexing tasks are addressed to
pub const INDEXER_AGENT: &str = "indexer";

/// Collects the string items of an optional JSON array field
pub(crate) fn string_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Executor of one stage's tasks. The orchestrator treats implementations as
/// opaque: it hands over the task's input payload and folds the returned
/// payload into the book. Implementations must tolerate being retried.
#[async_trait::async_trait]
pub trait StageAgent: Send + Sync {
    /// Tag tasks use to address this agent
    fn name(&self) -> &str;

    /// Executes one task of the given type against the input payload
    async fn execute(&self, task_type: TaskType, input: &Value) -> Result<Value, String>;
}
