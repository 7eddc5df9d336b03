pub mod forget_memory;
pub mod list_memories;
pub mod memory_stats;
pub mod search_memories;
pub mod store_memory;

use forget_memory::ForgetMemoryParams;
use list_memories::ListMemoriesParams;
use memory_stats::MemoryStatsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_memories::SearchMemoriesParams;
use store_memory::StoreMemoryParams;

use crate::memory::list::ListOptions;
use crate::memory::types::{Importance, NewMemory};
use crate::retrieval::{MemoryService, SearchMode, SearchRequest};

/// The Hearth MCP tool handler. Wraps the shared [`MemoryService`] and
/// exposes the memory operations via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct HearthTools {
    tool_router: ToolRouter<Self>,
    service: MemoryService,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

fn check_unit_interval(name: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(format!("{name} must be between 0.0 and 1.0")),
        _ => Ok(()),
    }
}

#[tool_router]
impl HearthTools {
    pub fn new(service: MemoryService) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }

    /// Store a new memory.
    #[tool(description = "Store a memory. It is keyword-searchable immediately and becomes semantically searchable once embedded.")]
    async fn store_memory(
        &self,
        Parameters(params): Parameters<StoreMemoryParams>,
    ) -> Result<String, String> {
        if params.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        let importance = params
            .importance
            .as_deref()
            .map(str::parse::<Importance>)
            .transpose()?;

        tracing::info!(
            content_len = params.content.len(),
            memory_type = ?params.r#type,
            "store_memory called"
        );

        let new = NewMemory {
            id: params.id,
            content: params.content,
            memory_type: params.r#type,
            category: params.category,
            importance,
            metadata: params.metadata,
            timestamp: None,
        };
        let result = self
            .service
            .store(new)
            .await
            .map_err(|e| format!("store failed: {e}"))?;

        to_json(&serde_json::json!({
            "success": true,
            "id": result.id,
            "timestamp": result.timestamp,
        }))
    }

    /// Search memories by keyword, meaning, or both.
    #[tool(description = "Search memories. Modes: keyword (exact terms), semantic (meaning), hybrid (both, default). Falls back to keyword results when semantic search is unavailable.")]
    async fn search_memories(
        &self,
        Parameters(params): Parameters<SearchMemoriesParams>,
    ) -> Result<String, String> {
        let mode = match params.mode.as_deref() {
            Some(raw) => raw.parse::<SearchMode>()?,
            None => SearchMode::default(),
        };
        check_unit_interval("semantic_weight", params.semantic_weight)?;
        check_unit_interval("threshold", params.threshold)?;

        tracing::info!(query = %params.query, mode = %mode, "search_memories called");

        let request = SearchRequest {
            mode,
            limit: params.limit,
            semantic_weight: params.semantic_weight,
            threshold: params.threshold,
            memory_type: params.r#type,
            include_failures: params.include_failures.unwrap_or(true),
        };
        let outcome = self
            .service
            .search(&params.query, &request)
            .await
            .map_err(|e| format!("search failed: {e}"))?;

        to_json(&serde_json::json!({
            "query": params.query,
            "mode": outcome.mode,
            "degraded": outcome.degraded,
            "count": outcome.results.len(),
            "results": outcome.results,
        }))
    }

    /// List recent memories.
    #[tool(description = "List memories newest first, optionally filtered by type.")]
    async fn list_memories(
        &self,
        Parameters(params): Parameters<ListMemoriesParams>,
    ) -> Result<String, String> {
        let retrieval = &self.service.config().retrieval;
        let options = ListOptions {
            limit: params
                .limit
                .unwrap_or(retrieval.default_limit)
                .clamp(1, retrieval.max_limit.max(1)),
            memory_type: params.r#type,
        };
        let memories = self
            .service
            .local()
            .get_all(options)
            .await
            .map_err(|e| format!("list failed: {e}"))?;

        to_json(&serde_json::json!({
            "count": memories.len(),
            "memories": memories,
        }))
    }

    /// Delete a memory.
    #[tool(description = "Permanently delete a memory by ID, locally and from the vector index.")]
    async fn forget_memory(
        &self,
        Parameters(params): Parameters<ForgetMemoryParams>,
    ) -> Result<String, String> {
        tracing::info!(
            id = %params.memory_id,
            reason = params.reason.as_deref().unwrap_or(""),
            "forget_memory called"
        );
        let result = self
            .service
            .delete(&params.memory_id)
            .await
            .map_err(|e| format!("delete failed: {e}"))?;
        to_json(&result)
    }

    /// Get statistics about the memory store.
    #[tool(description = "Get memory store statistics: totals, counts by type, recent activity, and whether vector search is enabled.")]
    async fn memory_stats(
        &self,
        Parameters(params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        let local = self.service.local();
        let stats = local
            .get_stats()
            .await
            .map_err(|e| format!("stats failed: {e}"))?;

        let mut body = serde_json::json!({
            "stats": stats,
            "vectorSearchEnabled": self.service.vector_search_enabled(),
        });
        if params.include_health.unwrap_or(false) {
            let health = local
                .health()
                .await
                .map_err(|e| format!("health check failed: {e}"))?;
            body["health"] = serde_json::to_value(&health).map_err(|e| e.to_string())?;
        }
        to_json(&body)
    }
}

#[tool_handler]
impl ServerHandler for HearthTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Hearth is a memory server. Use store_memory to save memories, \
                 search_memories to find them, and forget_memory to remove them."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
