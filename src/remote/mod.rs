//! Remote vector index: the derived, eventually consistent replica that
//! answers nearest-neighbor queries.
//!
//! The local store stays the source of truth. Everything here is best-effort;
//! callers treat any error as "semantic search unavailable" and degrade.

pub mod schema;
pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::RemoteConfig;
use crate::memory::types::{Importance, MemoryRecord, SearchHit};

/// The row shape stored remotely: the fields needed to rebuild a search hit,
/// plus the vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMemory {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: String,
    pub category: Option<String>,
    pub importance: String,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: i64,
    pub embedding: Vec<f32>,
}

impl RemoteMemory {
    pub fn from_record(record: &MemoryRecord, embedding: Vec<f32>) -> Self {
        Self {
            id: record.id.clone(),
            content: record.content.clone(),
            memory_type: record.memory_type.clone(),
            category: record.category.clone(),
            importance: record.importance.as_str().to_string(),
            metadata: record.metadata.clone(),
            timestamp: record.timestamp,
            embedding,
        }
    }

    /// Back to a local record (embedding kept).
    pub fn into_record(self) -> MemoryRecord {
        MemoryRecord {
            id: self.id,
            content: self.content,
            memory_type: self.memory_type,
            category: self.category,
            importance: Importance::parse_lenient(Some(&self.importance)),
            metadata: self.metadata,
            timestamp: self.timestamp,
            embedding: Some(self.embedding),
        }
    }
}

/// Approximate nearest-neighbor index over memory embeddings.
///
/// Other writers may share the index, so every write is idempotent by id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the row with this id.
    async fn upsert(&self, memory: &RemoteMemory) -> Result<()>;

    /// Hits with `similarity = 1 - cosine_distance >= threshold`, most
    /// similar first, at most `limit`.
    async fn search_semantic(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<SearchHit>>;

    /// Remove a row. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// The subset of `ids` already stored with a non-null embedding.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;
}

/// Build the configured index, or `None` when no remote is configured.
pub fn create_index(config: &RemoteConfig) -> Result<Option<Arc<dyn VectorIndex>>> {
    if !config.is_configured() {
        tracing::info!("no remote vector index configured, running lexical-only");
        return Ok(None);
    }
    let index = supabase::SupabaseIndex::from_config(config)?;
    Ok(Some(Arc::new(index)))
}

/// Keep hits at or above `threshold`, sorted most similar first, capped at `limit`.
pub(crate) fn finalize_semantic_hits(
    mut hits: Vec<SearchHit>,
    limit: usize,
    threshold: f64,
) -> Vec<SearchHit> {
    hits.retain(|hit| hit.score >= threshold);
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}
