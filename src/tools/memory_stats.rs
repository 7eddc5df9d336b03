//! MCP `memory_stats` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_stats` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {
    /// Include the schema version and integrity check in the response.
    #[schemars(description = "If true, include database health details (schema version, integrity)")]
    pub include_health: Option<bool>,
}
