mod parser;
use serde::{Deserialize, Serialize};

pub use parser::load_generation_config;

/// Top-level configuration for one book-generation run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    /// The structured outline the pipeline turns into a book
    pub outline: OutlineConfig,
    /// Global parameters tuning queue concurrency, retries and waits
    #[serde(default)]
    pub parameters: ParametersConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Structured outline of the book to generate
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutlineConfig {
    /// Title of the book
    pub title: String,
    /// Subject area the book covers
    pub subject: String,
    /// Target audience level (e.g. "Introductory")
    pub level: String,
    /// Ordered chapter outlines
    pub chapters: Vec<ChapterOutline>,
    /// Optional reference material the fact-checker cites
    #[serde(default)]
    pub reference: Option<String>,
}

/// Outline of a single chapter
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChapterOutline {
    /// Chapter title
    pub title: String,
    /// Position of the chapter within the book
    pub order_index: u32,
    /// Topics the chapter must cover
    #[serde(default)]
    pub topics: Vec<String>,
    /// Learning objectives the chapter must meet
    #[serde(default)]
    pub learning_objectives: Vec<String>,
}

/// Global parameters for pipeline execution
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ParametersConfig {
    /// Ceiling on how long one stage may wait for its tasks (e.g. "30m")
    #[serde(default)]
    pub stage_timeout: Option<String>,
    /// Interval between task status polls (e.g. "5s")
    #[serde(default)]
    pub poll_interval: Option<String>,
    /// Per-priority queue overrides
    #[serde(default)]
    pub queues: Option<QueuesConfig>,
}

/// Overrides for the three priority queues
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct QueuesConfig {
    #[serde(default)]
    pub high: Option<QueueSettings>,
    #[serde(default)]
    pub normal: Option<QueueSettings>,
    #[serde(default)]
    pub low: Option<QueueSettings>,
}

/// Settings for a single queue
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct QueueSettings {
    /// Maximum number of tasks the queue runs at once
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Retry behavior for tasks in this queue
    #[serde(default)]
    pub retry: Option<RetrySettings>,
}

/// Retry behavior attached to a queue
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct RetrySettings {
    /// Maximum number of retries after the first attempt
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Delay before the first retry (e.g. "1s")
    #[serde(default)]
    pub initial_delay: Option<String>,
    /// Factor applied to the delay between consecutive retries
    #[serde(default)]
    pub backoff_multiplier: Option<f64>,
    /// Upper bound on any backoff delay (e.g. "30s")
    #[serde(default)]
    pub max_delay: Option<String>,
}

/// Output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Format of the output
    pub format: String,
    /// File path for the output
    pub file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            file: "book.json".to_string(),
        }
    }
}
