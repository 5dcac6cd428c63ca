/// Number of stages in the generation pipeline, from initialization to indexing.
pub const TOTAL_PIPELINE_STEPS: u32 = 7;

/// Ceiling on how long the orchestrator waits for one stage's task batch.
pub const DEFAULT_STAGE_TIMEOUT: &str = "30m";

/// Interval between two status polls while waiting on a task batch.
pub const DEFAULT_POLL_INTERVAL: &str = "5s";

/// Maximum number of retries a queue grants a failing task by default.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff delay applied after a failed attempt.
pub const DEFAULT_INITIAL_DELAY: &str = "1s";

/// Factor applied to the backoff delay between consecutive retries.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Upper bound on any single backoff delay.
pub const DEFAULT_MAX_DELAY: &str = "30s";

/// Concurrency ceiling of the high-priority queue (drafting, fact-checking, validation).
pub const HIGH_QUEUE_CONCURRENCY: usize = 3;

/// Concurrency ceiling of the normal-priority queue (enhancement, formatting).
pub const NORMAL_QUEUE_CONCURRENCY: usize = 2;

/// Concurrency ceiling of the low-priority queue (index building).
pub const LOW_QUEUE_CONCURRENCY: usize = 1;

/// Prefix carried by every integrity digest so consumers can tell the scheme apart.
pub const INTEGRITY_HASH_PREFIX: &str = "sha256:";

/// JSON Schema every outline is checked against before a pipeline starts.
pub const OUTLINE_SCHEMA: &str = r#"{
    "type": "object",
    "required": ["title", "subject", "level", "chapters"],
    "properties": {
        "title": { "type": "string", "minLength": 1 },
        "subject": { "type": "string", "minLength": 1 },
        "level": { "type": "string", "minLength": 1 },
        "reference": { "type": ["string", "null"] },
        "chapters": {
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "required": ["title", "order_index"],
                "properties": {
                    "title": { "type": "string", "minLength": 1 },
                    "order_index": { "type": "integer", "minimum": 0 },
                    "topics": { "type": "array", "items": { "type": "string" } },
                    "learning_objectives": { "type": "array", "items": { "type": "string" } }
                }
            }
        }
    }
}"#;
