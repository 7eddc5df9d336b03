//! Hybrid search orchestration and the write path around it.
//!
//! [`MemoryService`] is built once at startup and handed to every surface
//! (HTTP, MCP, CLI, sync daemon). It fans a query out to the local store and
//! the remote vector index, merges the answers, and owns the degradation
//! contract: when the semantic side is unavailable the caller gets the
//! keyword results unchanged with `degraded = true`, never an error.

pub mod merge;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HearthConfig;
use crate::embedding::Embedder;
use crate::memory::local::LocalStore;
use crate::memory::search::SearchOptions;
use crate::memory::types::{DeleteResult, MemoryRecord, NewMemory, SearchHit, StoreResult};
use crate::remote::{RemoteMemory, VectorIndex};
pub use merge::{merge_weighted, Weights};

/// Remote over-fetch factor when type or failure filters will discard hits.
const FILTERED_OVERFETCH: usize = 4;

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Keyword,
    Semantic,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(format!("invalid search mode: {s}. Expected keyword, semantic, or hybrid")),
        }
    }
}

/// Everything a search call can tune. Unset fields fall back to config.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub limit: Option<usize>,
    /// In `[0, 1]`; the keyword weight becomes `1 - semantic_weight`.
    pub semantic_weight: Option<f64>,
    pub threshold: Option<f64>,
    pub memory_type: Option<String>,
    pub include_failures: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            limit: None,
            semantic_weight: None,
            threshold: None,
            memory_type: None,
            include_failures: true,
        }
    }
}

impl SearchRequest {
    pub fn with_mode(mode: SearchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchHit>,
    /// The mode that was asked for, even when the answer degraded.
    pub mode: SearchMode,
    /// `true` when the semantic side was unavailable and only keyword
    /// results are included.
    pub degraded: bool,
}

// ── Service ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MemoryService {
    local: LocalStore,
    embedder: Embedder,
    index: Option<Arc<dyn VectorIndex>>,
    config: Arc<HearthConfig>,
    remote_timeout: Duration,
}

impl MemoryService {
    pub fn new(
        local: LocalStore,
        embedder: Embedder,
        index: Option<Arc<dyn VectorIndex>>,
        config: Arc<HearthConfig>,
    ) -> Self {
        let remote_timeout = Duration::from_secs(config.remote.timeout_secs);
        Self {
            local,
            embedder,
            index,
            config,
            remote_timeout,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn index(&self) -> Option<&Arc<dyn VectorIndex>> {
        self.index.as_ref()
    }

    pub fn config(&self) -> &HearthConfig {
        &self.config
    }

    /// Semantic and hybrid search can actually use vectors.
    pub fn vector_search_enabled(&self) -> bool {
        self.embedder.is_available() && self.index.is_some()
    }

    fn resolve_limit(&self, limit: Option<usize>) -> usize {
        let retrieval = &self.config.retrieval;
        limit
            .unwrap_or(retrieval.default_limit)
            .clamp(1, retrieval.max_limit.max(1))
    }

    fn resolve_weights(&self, semantic_weight: Option<f64>) -> Weights {
        match semantic_weight {
            Some(w) => Weights::from_semantic(w),
            None => Weights {
                semantic: self.config.retrieval.semantic_weight,
                keyword: self.config.retrieval.keyword_weight,
            },
        }
    }

    async fn with_remote_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.remote_timeout, fut)
            .await
            .map_err(|_| anyhow!("remote index timed out after {:?}", self.remote_timeout))?
    }

    /// Ids among `ids` the remote already holds with an embedding.
    pub(crate) async fn remote_existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let index = self.index.as_ref().context("no remote vector index configured")?;
        self.with_remote_timeout(index.existing_ids(ids)).await
    }

    // ── Write path ────────────────────────────────────────────────────────────

    /// Store locally, then mirror to the remote index in the background.
    ///
    /// Only the local write can fail the call.
    pub async fn store(&self, new: NewMemory) -> Result<StoreResult> {
        let result = self.local.store(new).await?;
        tracing::info!(id = %result.id, "memory stored");

        if self.config.sync.mirror_on_write && self.vector_search_enabled() {
            let service = self.clone();
            let id = result.id.clone();
            tokio::spawn(async move {
                if let Err(e) = service.mirror(&id).await {
                    tracing::warn!(id = %id, error = %e, "mirror to remote index failed, sync will retry");
                }
            });
        }

        Ok(result)
    }

    /// Push one local record to the remote index.
    pub async fn mirror(&self, id: &str) -> Result<()> {
        let record = self
            .local
            .get(id)
            .await?
            .with_context(|| format!("memory {id} no longer exists"))?;
        self.push_record(record).await
    }

    /// Upsert a record remotely, reusing its cached embedding or generating
    /// (and caching) one, then mark the local row synced.
    ///
    /// A row replaced during the upload stays unsynced for the next tick; a
    /// row deleted during the upload has its replica removed again.
    pub(crate) async fn push_record(&self, record: MemoryRecord) -> Result<()> {
        let index = self.index.as_ref().context("no remote vector index configured")?;

        let embedding = match record.embedding.clone() {
            Some(embedding) => embedding,
            None => {
                let embedding = self
                    .embedder
                    .embed(&record.content)
                    .await
                    .context("embedding unavailable")?;
                self.local
                    .set_embedding_if_missing(&record.id, &record.content, embedding.clone())
                    .await?;
                embedding
            }
        };

        let remote = RemoteMemory::from_record(&record, embedding);
        self.with_remote_timeout(index.upsert(&remote)).await?;

        let id = record.id.clone();
        if self.local.mark_synced(record).await? {
            tracing::debug!(id = %id, "mirrored to remote index");
        } else if self.local.get(&id).await?.is_none() {
            tracing::debug!(id = %id, "memory deleted during upload, removing replica");
            self.delete_remote_or_queue(&id).await?;
        } else {
            tracing::debug!(id = %id, "memory changed during upload, left for the next sync");
        }
        Ok(())
    }

    /// Delete locally (errors propagate), then best-effort remotely.
    ///
    /// A failed remote delete is queued and retried by the sync daemon.
    pub async fn delete(&self, id: &str) -> Result<DeleteResult> {
        let result = self.local.delete_memory(id).await?;
        self.delete_remote_or_queue(id).await?;
        tracing::info!(id = %id, success = result.success, "memory deleted");
        Ok(result)
    }

    /// Delete one replica under the remote timeout.
    pub(crate) async fn delete_remote(&self, id: &str) -> Result<()> {
        let index = self.index.as_ref().context("no remote vector index configured")?;
        self.with_remote_timeout(index.delete(id)).await
    }

    /// Only a failure to queue the retry is an error.
    async fn delete_remote_or_queue(&self, id: &str) -> Result<()> {
        if self.index.is_none() {
            return Ok(());
        }
        if let Err(e) = self.delete_remote(id).await {
            tracing::warn!(id = %id, error = %e, "remote delete failed, queued for retry");
            self.local.queue_remote_delete(id).await?;
        }
        Ok(())
    }

    // ── Read path ─────────────────────────────────────────────────────────────

    /// Dispatch on `request.mode`.
    pub async fn search(&self, query: &str, request: &SearchRequest) -> Result<SearchOutcome> {
        match request.mode {
            SearchMode::Keyword => self.search_keyword(query, request).await,
            SearchMode::Semantic => self.search_semantic(query, request).await,
            SearchMode::Hybrid => self.search_hybrid(query, request).await,
        }
    }

    fn keyword_options(&self, request: &SearchRequest, limit: usize) -> SearchOptions {
        SearchOptions {
            limit,
            memory_type: request.memory_type.clone(),
            include_failures: request.include_failures,
        }
    }

    pub async fn search_keyword(&self, query: &str, request: &SearchRequest) -> Result<SearchOutcome> {
        let limit = self.resolve_limit(request.limit);
        let results = self
            .local
            .search(query, self.keyword_options(request, limit))
            .await?;
        Ok(SearchOutcome {
            results,
            mode: SearchMode::Keyword,
            degraded: false,
        })
    }

    async fn degrade_to_keyword(&self, query: &str, request: &SearchRequest, mode: SearchMode) -> Result<SearchOutcome> {
        let mut outcome = self.search_keyword(query, request).await?;
        outcome.mode = mode;
        outcome.degraded = true;
        Ok(outcome)
    }

    /// Embed the query, or log why not.
    async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        if !self.vector_search_enabled() {
            tracing::debug!("vector search not configured, using keyword results");
            return None;
        }
        let embedding = self.embedder.embed(query).await;
        if embedding.is_none() {
            tracing::warn!("query embedding unavailable, using keyword results");
        }
        embedding
    }

    /// Remote leg, resolved against the local store, with the request's type
    /// and failure filters applied.
    async fn remote_search(
        &self,
        embedding: &[f32],
        limit: usize,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>> {
        let index = self.index.as_ref().context("no remote vector index configured")?;
        let threshold = request
            .threshold
            .unwrap_or(self.config.retrieval.similarity_threshold);
        let filtered = request.memory_type.is_some() || !request.include_failures;
        let fetch = if filtered {
            limit.saturating_mul(FILTERED_OVERFETCH)
        } else {
            limit
        };

        let hits = self
            .with_remote_timeout(index.search_semantic(embedding, fetch, threshold))
            .await?;
        let mut hits = self.resolve_locally(hits).await?;
        hits.retain(|hit| passes_filters(hit, request));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Replace each remote hit's fields with the local copy. Hits whose
    /// record no longer exists locally are dropped.
    async fn resolve_locally(&self, hits: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
        if hits.is_empty() {
            return Ok(hits);
        }
        let ids = hits.iter().map(|hit| hit.id().to_string()).collect();
        let mut records = self.local.get_many(ids).await?;

        let fetched = hits.len();
        let resolved: Vec<SearchHit> = hits
            .into_iter()
            .filter_map(|mut hit| {
                let record = records.remove(hit.id())?;
                hit.memory = record;
                Some(hit)
            })
            .collect();
        if resolved.len() < fetched {
            tracing::debug!(
                dropped = fetched - resolved.len(),
                "remote hits without a local record dropped"
            );
        }
        Ok(resolved)
    }

    pub async fn search_semantic(&self, query: &str, request: &SearchRequest) -> Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                mode: SearchMode::Semantic,
                degraded: false,
            });
        }
        let Some(embedding) = self.embed_query(query).await else {
            return self.degrade_to_keyword(query, request, SearchMode::Semantic).await;
        };

        let limit = self.resolve_limit(request.limit);
        match self.remote_search(&embedding, limit, request).await {
            Ok(results) => Ok(SearchOutcome {
                results,
                mode: SearchMode::Semantic,
                degraded: false,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "semantic search failed, using keyword results");
                self.degrade_to_keyword(query, request, SearchMode::Semantic).await
            }
        }
    }

    pub async fn search_hybrid(&self, query: &str, request: &SearchRequest) -> Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                mode: SearchMode::Hybrid,
                degraded: false,
            });
        }
        let Some(embedding) = self.embed_query(query).await else {
            return self.degrade_to_keyword(query, request, SearchMode::Hybrid).await;
        };

        let limit = self.resolve_limit(request.limit);
        let fetch = limit.saturating_mul(2);
        let (semantic, keyword) = tokio::join!(
            self.remote_search(&embedding, fetch, request),
            self.local.search(query, self.keyword_options(request, fetch)),
        );
        let mut keyword = keyword?;

        let semantic = match semantic {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "semantic leg failed, using keyword results");
                keyword.truncate(limit);
                return Ok(SearchOutcome {
                    results: keyword,
                    mode: SearchMode::Hybrid,
                    degraded: true,
                });
            }
        };

        let weights = self.resolve_weights(request.semantic_weight);
        tracing::debug!(
            semantic = semantic.len(),
            keyword = keyword.len(),
            ws = weights.semantic,
            wk = weights.keyword,
            "merging hybrid results"
        );
        Ok(SearchOutcome {
            results: merge_weighted(semantic, keyword, weights, limit),
            mode: SearchMode::Hybrid,
            degraded: false,
        })
    }
}

fn passes_filters(hit: &SearchHit, request: &SearchRequest) -> bool {
    if let Some(memory_type) = &request.memory_type {
        if &hit.memory.memory_type != memory_type {
            return false;
        }
    }
    if !request.include_failures {
        let is_failure = |s: &str| matches!(s.to_ascii_lowercase().as_str(), "error" | "failure");
        if is_failure(&hit.memory.memory_type)
            || hit.memory.category.as_deref().is_some_and(is_failure)
        {
            return false;
        }
    }
    true
}
