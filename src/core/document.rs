use crate::config::OutlineConfig;
use crate::constants::INTEGRITY_HASH_PREFIX;
use crate::errors::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One chapter of the composite document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// Unique identifier of the chapter
    pub id: String,
    /// Position of the chapter within the book
    pub order_index: u32,
    /// Chapter title
    pub title: String,
    /// Narrative content
    pub content: String,
    /// Diagram descriptions attached during formatting
    pub diagrams: Vec<String>,
    /// References attached during fact-checking
    pub references: Vec<String>,
    /// Summaries attached during enhancement
    pub summaries: Vec<String>,
    /// Exercises attached during enhancement
    pub exercises: Vec<String>,
}

/// Scores and timestamps describing the generated book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Overall quality score reported by validation
    pub quality_score: f64,
    /// Outline-alignment score reported by validation
    pub alignment_score: f64,
    /// When generation started
    pub generation_date: DateTime<Utc>,
    /// When the book last passed validation
    pub last_validated: Option<DateTime<Utc>>,
}

/// The aggregate artifact assembled incrementally across all pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeDocument {
    /// Unique identifier of the book
    pub id: String,
    /// Book title
    pub title: String,
    /// Subject area
    pub subject: String,
    /// Target audience level
    pub level: String,
    /// Ordered chapters
    pub chapters: Vec<Chapter>,
    /// Generation metadata
    pub metadata: DocumentMetadata,
    /// Digest over the final chapters and metadata, set by the last stage
    pub integrity_hash: Option<String>,
}

impl CompositeDocument {
    /// Builds the empty document the pipeline starts from, carrying only the
    /// outline's descriptive metadata. Chapters are materialized when the
    /// drafting stage finishes.
    pub fn from_outline(outline: &OutlineConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: outline.title.clone(),
            subject: outline.subject.clone(),
            level: outline.level.clone(),
            chapters: Vec::new(),
            metadata: DocumentMetadata {
                quality_score: 0.0,
                alignment_score: 0.0,
                generation_date: Utc::now(),
                last_validated: None,
            },
            integrity_hash: None,
        }
    }

    /// Looks up a chapter by id
    pub fn chapter_mut(&mut self, chapter_id: &str) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id == chapter_id)
    }

    /// Computes the digest over the final chapters and metadata. The same
    /// content and metadata always produce the same digest; any change
    /// produces a different one.
    pub fn compute_integrity_hash(&self) -> Result<String, Error> {
        let payload = serde_json::to_vec(&serde_json::json!({
            "chapters": self.chapters,
            "metadata": self.metadata,
        }))?;
        let mut hasher = Sha256::new();
        hasher.update(&payload);
        Ok(format!(
            "{}{}",
            INTEGRITY_HASH_PREFIX,
            hex::encode(hasher.finalize())
        ))
    }
}
