//! Supabase (PostgREST + pgvector) implementation of [`VectorIndex`].
//!
//! Rows live in `/rest/v1/{table}`; similarity search goes through the
//! `match_memories` RPC installed by [`super::schema::REMOTE_SCHEMA_SQL`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::{finalize_semantic_hits, RemoteMemory, VectorIndex};
use crate::config::RemoteConfig;
use crate::memory::types::{Importance, MemoryRecord, SearchHit, DEFAULT_MEMORY_TYPE};

/// PostgREST URLs get long; existence checks are split into chunks this size.
const ID_CHUNK: usize = 100;

pub struct SupabaseIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    table: String,
    match_function: String,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f64,
    match_count: usize,
}

/// One row returned by the match RPC.
#[derive(Deserialize)]
struct MatchRow {
    id: String,
    content: String,
    #[serde(rename = "type", default)]
    memory_type: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    importance: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    timestamp: i64,
    similarity: f64,
}

impl From<MatchRow> for SearchHit {
    fn from(row: MatchRow) -> Self {
        let memory = MemoryRecord {
            id: row.id,
            content: row.content,
            memory_type: row.memory_type.unwrap_or_else(|| DEFAULT_MEMORY_TYPE.to_string()),
            category: row.category,
            importance: Importance::parse_lenient(row.importance.as_deref()),
            metadata: row.metadata,
            timestamp: row.timestamp,
            embedding: None,
        };
        SearchHit::semantic(memory, row.similarity)
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

impl SupabaseIndex {
    pub fn new(
        base_url: &str,
        api_key: String,
        table: impl Into<String>,
        match_function: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build remote index HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key),
            table: table.into(),
            match_function: match_function.into(),
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let url = config.url.as_deref().context("remote.url is not set")?;
        let key = config.api_key.clone().context("remote.api_key is not set")?;
        Self::new(
            url,
            key,
            config.table.clone(),
            config.match_function.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn table_url(&self) -> Result<Url> {
        Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))
            .context("invalid remote index URL")
    }

    fn rpc_url(&self) -> Result<Url> {
        Url::parse(&format!("{}/rest/v1/rpc/{}", self.base_url, self.match_function))
            .context("invalid remote index URL")
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", key.as_str())
            .bearer_auth(key)
    }

    /// Cheap reachability and credential check used by `doctor`.
    pub async fn ping(&self) -> Result<()> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");
        self.request(Method::GET, url)
            .send()
            .await?
            .error_for_status()
            .context("remote index rejected the probe")?;
        Ok(())
    }
}

/// PostgREST `in.(...)` list with every value double-quoted.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl VectorIndex for SupabaseIndex {
    async fn upsert(&self, memory: &RemoteMemory) -> Result<()> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("on_conflict", "id");
        self.request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(memory)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("upsert of {} rejected", memory.id))?;
        Ok(())
    }

    async fn search_semantic(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<SearchHit>> {
        let body = MatchRequest {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: limit,
        };
        let rows = self
            .request(Method::POST, self.rpc_url()?)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .context("match RPC failed")?
            .json::<Vec<MatchRow>>()
            .await
            .context("malformed match RPC response")?;

        let hits = rows.into_iter().map(SearchHit::from).collect();
        Ok(finalize_semantic_hits(hits, limit, threshold))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        self.request(Method::DELETE, url)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("remote delete of {id} rejected"))?;
        Ok(())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut found = HashSet::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut url = self.table_url()?;
            url.query_pairs_mut()
                .append_pair("select", "id")
                .append_pair("id", &in_filter(chunk))
                .append_pair("embedding", "not.is.null");
            let rows = self
                .request(Method::GET, url)
                .send()
                .await?
                .error_for_status()
                .context("remote id lookup failed")?
                .json::<Vec<IdRow>>()
                .await
                .context("malformed id lookup response")?;
            found.extend(rows.into_iter().map(|row| row.id));
        }
        Ok(found)
    }
}
