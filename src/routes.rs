//! REST surface over [`MemoryService`].
//!
//! Local-store failures are 500s. Remote and embedding failures never reach
//! this layer as errors; they show up as `degraded: true` on search results.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::memory::list::ListOptions;
use crate::memory::stats::StatsResponse;
use crate::memory::types::{Importance, MemoryRecord, NewMemory, SearchHit};
use crate::retrieval::{MemoryService, SearchMode, SearchRequest};

#[derive(Clone)]
pub struct AppState {
    pub service: MemoryService,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/memory", post(store_handler))
        .route("/memory/{id}", delete(delete_handler))
        .route("/memories", get(list_handler))
        .route("/search", get(search_handler))
        .route("/search/semantic", get(semantic_handler))
        .route("/search/hybrid", get(hybrid_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Request / response bodies ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StoreMemoryRequest {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub memory_type: Option<String>,
    pub category: Option<String>,
    pub importance: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub id: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StoreMemoryResponse {
    pub success: bool,
    pub id: String,
    pub timestamp: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub mode: Option<String>,
    pub limit: Option<usize>,
    pub semantic_weight: Option<f64>,
    pub threshold: Option<f64>,
    #[serde(rename = "type")]
    pub memory_type: Option<String>,
    pub include_failures: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub degraded: bool,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub memory_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub memories: Vec<MemoryRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub vector_search_enabled: bool,
    pub embedding_model: Option<String>,
    pub stats: StatsResponse,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let stats = state.service.local().get_stats().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        vector_search_enabled: state.service.vector_search_enabled(),
        embedding_model: state.service.embedder().model_name().map(str::to_string),
        stats,
    }))
}

async fn store_handler(
    State(state): State<AppState>,
    Json(req): Json<StoreMemoryRequest>,
) -> ApiResult<(StatusCode, Json<StoreMemoryResponse>)> {
    let new = validate_store_request(req)?;
    let result = state.service.store(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(StoreMemoryResponse {
            success: true,
            id: result.id,
            timestamp: result.timestamp,
        }),
    ))
}

async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let result = state.service.delete(&id).await?;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(result)).into_response())
}

async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let max = state.service.config().retrieval.max_limit.max(1);
    let options = ListOptions {
        limit: params.limit.unwrap_or(max).clamp(1, max),
        memory_type: params.memory_type,
    };
    let memories = state.service.local().get_all(options).await?;
    Ok(Json(ListResponse {
        count: memories.len(),
        memories,
    }))
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    run_search(&state, params, None).await
}

async fn semantic_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    run_search(&state, params, Some(SearchMode::Semantic)).await
}

async fn hybrid_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    run_search(&state, params, Some(SearchMode::Hybrid)).await
}

async fn run_search(
    state: &AppState,
    params: SearchParams,
    forced_mode: Option<SearchMode>,
) -> ApiResult<Json<SearchResponse>> {
    let (query, request) = validate_search_params(params, forced_mode)?;
    let outcome = state.service.search(&query, &request).await?;
    Ok(Json(SearchResponse {
        query,
        mode: outcome.mode,
        degraded: outcome.degraded,
        count: outcome.results.len(),
        results: outcome.results,
    }))
}

// ── Validation ────────────────────────────────────────────────────────────────

fn validate_store_request(req: StoreMemoryRequest) -> ApiResult<NewMemory> {
    let content = req
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("content is required".into()))?;
    let importance = req
        .importance
        .as_deref()
        .map(str::parse::<Importance>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    Ok(NewMemory {
        id: req.id,
        content,
        memory_type: req.memory_type,
        category: req.category,
        importance,
        metadata: req.metadata,
        timestamp: req.timestamp,
    })
}

fn validate_search_params(
    params: SearchParams,
    forced_mode: Option<SearchMode>,
) -> ApiResult<(String, SearchRequest)> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'q' is required".into()))?;

    let mode = match (forced_mode, params.mode.as_deref()) {
        (Some(mode), _) => mode,
        (None, Some(raw)) => raw.parse().map_err(ApiError::BadRequest)?,
        (None, None) => SearchMode::default(),
    };

    for (name, value) in [
        ("semanticWeight", params.semantic_weight),
        ("threshold", params.threshold),
    ] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(ApiError::BadRequest(format!("{name} must be between 0 and 1")));
            }
        }
    }

    Ok((
        query,
        SearchRequest {
            mode,
            limit: params.limit,
            semantic_weight: params.semantic_weight,
            threshold: params.threshold,
            memory_type: params.memory_type,
            include_failures: params.include_failures.unwrap_or(true),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: &str) -> SearchParams {
        SearchParams {
            q: Some(q.into()),
            ..SearchParams::default()
        }
    }

    #[test]
    fn search_params_default_to_hybrid() {
        let (query, request) = validate_search_params(params("filter size"), None).unwrap();
        assert_eq!(query, "filter size");
        assert_eq!(request.mode, SearchMode::Hybrid);
        assert!(request.include_failures);
    }

    #[test]
    fn search_params_reject_bad_input() {
        assert!(matches!(
            validate_search_params(SearchParams::default(), None),
            Err(ApiError::BadRequest(_))
        ));

        let mut bad_mode = params("x");
        bad_mode.mode = Some("vector".into());
        assert!(validate_search_params(bad_mode, None).is_err());

        let mut bad_weight = params("x");
        bad_weight.semantic_weight = Some(1.5);
        assert!(validate_search_params(bad_weight, None).is_err());
    }

    #[test]
    fn forced_mode_wins() {
        let mut p = params("x");
        p.mode = Some("keyword".into());
        let (_, request) = validate_search_params(p, Some(SearchMode::Semantic)).unwrap();
        assert_eq!(request.mode, SearchMode::Semantic);
    }

    #[test]
    fn store_request_validation() {
        let empty = StoreMemoryRequest {
            content: Some("   ".into()),
            memory_type: None,
            category: None,
            importance: None,
            metadata: None,
            id: None,
            timestamp: None,
        };
        assert!(matches!(validate_store_request(empty), Err(ApiError::BadRequest(_))));

        let ok = StoreMemoryRequest {
            content: Some("Pick up the kids at 3".into()),
            memory_type: Some("reminder".into()),
            category: None,
            importance: Some("High".into()),
            metadata: Some(json!({"who": "au pair"})),
            id: None,
            timestamp: None,
        };
        let new = validate_store_request(ok).unwrap();
        assert_eq!(new.importance, Some(Importance::High));
        assert_eq!(new.memory_type.as_deref(), Some("reminder"));
    }
}
