#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use hearth::config::{EmbeddingConfig, HearthConfig};
use hearth::embedding::{Embedder, EmbeddingProvider, EMBEDDING_DIM};
use hearth::memory::local::LocalStore;
use hearth::memory::types::{NewMemory, SearchHit};
use hearth::remote::{RemoteMemory, VectorIndex};
use hearth::retrieval::MemoryService;

/// Words grouped by the concept axis they load onto. Anything outside these
/// groups lands on a shared "other" axis.
const CONCEPTS: &[&[&str]] = &[
    &["regulatory", "regulations", "fda", "compliance", "mandate", "documentation"],
    &["healthcare", "medical", "patient", "device", "clinic"],
    &["calendar", "scheduling", "practice", "tuesday", "appointment"],
    &["furnace", "boiler", "thermostat", "heating"],
];

const OTHER_AXIS: usize = CONCEPTS.len();

/// Deterministic stand-in for a real embedding model: synonyms share an
/// axis, so texts about the same topic come out close in cosine terms.
pub struct ConceptEmbedder;

impl ConceptEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let axis = CONCEPTS
                .iter()
                .position(|group| group.contains(&word))
                .unwrap_or(OTHER_AXIS);
            if axis != OTHER_AXIS {
                v[axis] += 1.0;
            }
        }
        if v.iter().all(|x| *x == 0.0) {
            v[OTHER_AXIS] = 1.0;
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for ConceptEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn model_name(&self) -> &str {
        "concept-test"
    }
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)) as f64
}

/// Brute-force cosine index held in memory. Ids in `reject` fail on upsert;
/// with `fail_deletes` set every delete errs.
#[derive(Default)]
pub struct InMemoryIndex {
    rows: Mutex<HashMap<String, RemoteMemory>>,
    reject: Mutex<HashSet<String>>,
    upserts: Mutex<usize>,
    fail_deletes: Mutex<bool>,
}

impl InMemoryIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.lock().unwrap().contains_key(id)
    }

    pub fn upsert_count(&self) -> usize {
        *self.upserts.lock().unwrap()
    }

    pub fn reject(&self, id: &str) {
        self.reject.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock().unwrap() = fail;
    }

    /// Content the replica holds for `id`.
    pub fn content_of(&self, id: &str) -> Option<String> {
        self.rows.lock().unwrap().get(id).map(|row| row.content.clone())
    }

    /// Seed a row directly, as another writer sharing the index would.
    pub fn seed(&self, memory: RemoteMemory) {
        self.rows.lock().unwrap().insert(memory.id.clone(), memory);
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, memory: &RemoteMemory) -> Result<()> {
        if self.reject.lock().unwrap().contains(&memory.id) {
            bail!("index rejected {}", memory.id);
        }
        *self.upserts.lock().unwrap() += 1;
        self.rows
            .lock()
            .unwrap()
            .insert(memory.id.clone(), memory.clone());
        Ok(())
    }

    async fn search_semantic(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<SearchHit>> {
        let rows = self.rows.lock().unwrap();
        let mut hits: Vec<SearchHit> = rows
            .values()
            .map(|row| (cosine(embedding, &row.embedding), row.clone()))
            .filter(|(similarity, _)| *similarity >= threshold)
            .map(|(similarity, row)| {
                let mut record = row.into_record();
                record.embedding = None;
                SearchHit::semantic(record, similarity)
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if *self.fail_deletes.lock().unwrap() {
            bail!("delete of {id} timed out upstream");
        }
        self.rows.lock().unwrap().remove(id);
        Ok(())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let rows = self.rows.lock().unwrap();
        Ok(ids.iter().filter(|id| rows.contains_key(*id)).cloned().collect())
    }
}

/// An index whose every call fails, like an unreachable Supabase.
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _memory: &RemoteMemory) -> Result<()> {
        bail!("connection refused")
    }

    async fn search_semantic(&self, _: &[f32], _: usize, _: f64) -> Result<Vec<SearchHit>> {
        bail!("connection refused")
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        bail!("connection refused")
    }

    async fn existing_ids(&self, _ids: &[String]) -> Result<HashSet<String>> {
        bail!("connection refused")
    }
}

/// An index that accepts every call and never answers.
pub struct HangingIndex;

#[async_trait]
impl VectorIndex for HangingIndex {
    async fn upsert(&self, _memory: &RemoteMemory) -> Result<()> {
        std::future::pending().await
    }

    async fn search_semantic(&self, _: &[f32], _: usize, _: f64) -> Result<Vec<SearchHit>> {
        std::future::pending().await
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        std::future::pending().await
    }

    async fn existing_ids(&self, _ids: &[String]) -> Result<HashSet<String>> {
        std::future::pending().await
    }
}

/// Config for tests: background mirroring off so sync is driven explicitly.
pub fn test_config() -> HearthConfig {
    let mut config = HearthConfig::default();
    config.sync.mirror_on_write = false;
    config
}

pub fn concept_embedder() -> Embedder {
    Embedder::new(Some(Arc::new(ConceptEmbedder)), &EmbeddingConfig::default())
}

pub fn service_with(
    embedder: Embedder,
    index: Option<Arc<dyn VectorIndex>>,
    config: HearthConfig,
) -> MemoryService {
    MemoryService::new(
        LocalStore::in_memory().unwrap(),
        embedder,
        index,
        Arc::new(config),
    )
}

/// Keyword-only service: no embedder, no index.
pub fn keyword_service() -> MemoryService {
    service_with(Embedder::disabled(), None, test_config())
}

/// Fully vector-enabled service backed by an [`InMemoryIndex`].
pub fn vector_service() -> (MemoryService, Arc<InMemoryIndex>) {
    let index = InMemoryIndex::new();
    let service = service_with(concept_embedder(), Some(index.clone()), test_config());
    (service, index)
}

/// Service whose remote index is unreachable.
pub fn unreachable_service() -> MemoryService {
    service_with(concept_embedder(), Some(Arc::new(FailingIndex)), test_config())
}

/// Service whose remote index hangs; calls give up after `timeout_secs`.
pub fn hanging_service(timeout_secs: u64) -> MemoryService {
    let mut config = test_config();
    config.remote.timeout_secs = timeout_secs;
    service_with(concept_embedder(), Some(Arc::new(HangingIndex)), config)
}

/// Store `content` under a fixed id and timestamp.
pub async fn put(service: &MemoryService, id: &str, content: &str, timestamp: i64) {
    let new = NewMemory {
        id: Some(id.to_string()),
        timestamp: Some(timestamp),
        ..NewMemory::new(content)
    };
    service.store(new).await.unwrap();
}

pub fn ids(hits: &[SearchHit]) -> Vec<String> {
    hits.iter().map(|h| h.id().to_string()).collect()
}
