//! MCP `search_memories` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `search_memories` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchMemoriesParams {
    /// Natural language or keyword query.
    #[schemars(description = "Natural language or keyword query")]
    pub query: String,

    /// `"keyword"`, `"semantic"`, or `"hybrid"` (default).
    #[schemars(
        description = "Search mode: 'keyword' (exact terms), 'semantic' (meaning), or 'hybrid' (both, default)"
    )]
    pub mode: Option<String>,

    /// Maximum number of results. Defaults to the configured limit.
    #[schemars(description = "Maximum number of results to return. Defaults to 10.")]
    pub limit: Option<usize>,

    /// Weight of the semantic score in hybrid mode (0.0–1.0).
    #[schemars(
        description = "Weight of semantic similarity in hybrid mode (0.0-1.0). Keyword weight is 1 minus this. Defaults to 0.7."
    )]
    pub semantic_weight: Option<f64>,

    /// Minimum semantic similarity (0.0–1.0).
    #[schemars(description = "Minimum semantic similarity (0.0-1.0). Defaults to 0.5.")]
    pub threshold: Option<f64>,

    /// Restrict results to one type.
    #[schemars(description = "Only return memories of this type")]
    pub r#type: Option<String>,

    /// Set to `false` to hide error/failure memories.
    #[schemars(description = "Include memories typed or categorized as error/failure (default: true)")]
    pub include_failures: Option<bool>,
}
