//! Core memory type definitions.
//!
//! Defines [`Importance`], the stored [`MemoryRecord`], the write-side
//! [`NewMemory`] input, and [`SearchHit`], the result shape shared by the
//! keyword, semantic, and hybrid search paths.

use serde::{Deserialize, Serialize};

/// Type assigned when a caller does not supply one.
pub const DEFAULT_MEMORY_TYPE: &str = "general";

/// Ordinal importance tag. Used for display and sorting only, never for filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Importance {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse leniently: unknown or missing values fall back to `Medium`.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        s.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("unknown importance: {s}")),
        }
    }
}

/// A stored memory, matching the `memories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UUID v7 unless the caller supplied its own id.
    pub id: String,
    pub content: String,
    /// Free-form classification tag (e.g. `"solution"`, `"decision"`).
    #[serde(rename = "type")]
    pub memory_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub importance: Importance,
    /// Caller-defined annotations. Never inspected by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Only loaded on the sync paths; search and listing leave it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Input to the write path. Everything except `content` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMemory {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default, rename = "type")]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub importance: Option<Importance>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl NewMemory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, memory_type: impl Into<String>) -> Self {
        self.memory_type = Some(memory_type.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Which search path produced (part of) a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    /// FTS5 BM25 match.
    Keyword,
    /// Substring fallback after the FTS query failed.
    Substring,
    /// Vector similarity from the remote index.
    Semantic,
}

impl HitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Substring => "substring",
            Self::Semantic => "semantic",
        }
    }
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub memory: MemoryRecord,
    /// Final ranking score in `[0, 1]`.
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
    pub sources: Vec<HitSource>,
}

impl SearchHit {
    pub fn keyword(memory: MemoryRecord, similarity: f64, source: HitSource) -> Self {
        Self {
            memory,
            score: similarity,
            keyword_similarity: Some(similarity),
            semantic_similarity: None,
            sources: vec![source],
        }
    }

    pub fn semantic(memory: MemoryRecord, similarity: f64) -> Self {
        Self {
            memory,
            score: similarity,
            keyword_similarity: None,
            semantic_similarity: Some(similarity),
            sources: vec![HitSource::Semantic],
        }
    }

    pub fn id(&self) -> &str {
        &self.memory.id
    }
}

/// Result of a store operation.
#[derive(Debug, Clone, Serialize)]
pub struct StoreResult {
    pub id: String,
    pub timestamp: i64,
}

/// Result of a delete operation. `success` is `false` when the id was unknown.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteResult {
    pub success: bool,
}
