//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, an OpenAI-compatible HTTP
//! implementation, and [`Embedder`], the failure-tolerant wrapper the rest
//! of the crate calls. The provider is created via [`create_provider`] from
//! configuration.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Number of dimensions in the embedding vectors (text-embedding-3-small).
pub const EMBEDDING_DIM: usize = 1536;

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier recorded alongside cached vectors.
    fn model_name(&self) -> &str;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Returns `Ok(None)` when embeddings are disabled (`provider = "none"`) or
/// the OpenAI provider has no API key. Semantic search is then unavailable,
/// and keyword search carries on alone.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "none" | "disabled" => Ok(None),
        "openai" => {
            let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
                tracing::info!("no embedding API key configured, semantic search disabled");
                return Ok(None);
            };
            let provider = openai::OpenAiEmbeddingProvider::new(api_key)
                .with_model(config.model.clone(), config.dimensions)
                .with_base_url(config.base_url.clone())
                .with_timeout(Duration::from_secs(config.timeout_secs))?;
            Ok(Some(Arc::new(provider)))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai, none"),
    }
}

// ── Embedder ──────────────────────────────────────────────────────────────────

/// Failure-tolerant front end over an optional provider.
///
/// Input is truncated to `max_input_chars` (on a char boundary) before it is
/// sent. Every failure mode (no provider, transport error, timeout, wrong
/// vector length) is logged and reported as `None`; callers degrade instead
/// of failing.
#[derive(Clone)]
pub struct Embedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    max_input_chars: usize,
    timeout: Duration,
}

impl Embedder {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, config: &EmbeddingConfig) -> Self {
        Self {
            provider,
            max_input_chars: config.max_input_chars,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// An embedder that never produces vectors.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            max_input_chars: 0,
            timeout: Duration::ZERO,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self::new(create_provider(config)?, config))
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model_name())
    }

    /// Embed `text`, or `None` if no vector could be produced.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let provider = self.provider.as_ref()?;
        let input = truncate_chars(text, self.max_input_chars);
        if input.trim().is_empty() {
            return None;
        }

        let vector = match tokio::time::timeout(self.timeout, provider.embed(input)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "embedding request failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "embedding request timed out");
                return None;
            }
        };

        if vector.len() != provider.dimensions() {
            tracing::warn!(
                expected = provider.dimensions(),
                actual = vector.len(),
                "embedding has wrong dimensionality, discarded"
            );
            return None;
        }
        Some(vector)
    }
}

/// The longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
