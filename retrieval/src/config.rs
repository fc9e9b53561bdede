//! Configuration for embedding, retrieval and context assembly.

use std::sync::Arc;
use std::time::Duration;

use courtside_embeddings::{
    CachedProvider, EmbeddingCache, EmbeddingProvider, HashingProvider, OpenAIProvider,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Output dimension; `None` keeps the model default.
    pub dimensions: Option<usize>,

    /// Base URL for OpenAI-compatible endpoints.
    pub base_url: Option<String>,

    /// Per-request timeout for the HTTP client.
    pub request_timeout_secs: u64,

    /// Documents embedded per request while indexing.
    pub batch_size: usize,

    /// Bound on one indexing batch, including any per-text fallback.
    pub batch_timeout_secs: u64,

    /// Whether to cache embeddings.
    pub cache_enabled: bool,

    /// Maximum cache size.
    pub cache_max_entries: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            model: None,
            dimensions: None,
            base_url: None,
            request_timeout_secs: 30,
            batch_size: 64,
            batch_timeout_secs: 120,
            cache_enabled: true,
            cache_max_entries: 10_000,
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration using the hashing provider.
    pub fn offline() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            ..Self::default()
        }
    }

    /// Bound on one indexing batch.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs.max(1))
    }

    /// Instantiate the configured provider.
    pub fn build_provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self.provider {
            EmbeddingProviderType::OpenAI => {
                let mut provider = OpenAIProvider::new()
                    .with_timeout(Duration::from_secs(self.request_timeout_secs));
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(dims) = self.dimensions {
                    provider = provider.with_dimensions(dims);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                self.wrap(provider)
            }
            EmbeddingProviderType::Hashing => {
                let provider = self
                    .dimensions
                    .map(HashingProvider::new)
                    .unwrap_or_default();
                self.wrap(provider)
            }
        }
    }

    fn wrap<P: EmbeddingProvider + 'static>(&self, provider: P) -> Arc<dyn EmbeddingProvider> {
        if self.cache_enabled {
            Arc::new(CachedProvider::new(
                provider,
                EmbeddingCache::new(self.cache_max_entries),
            ))
        } else {
            Arc::new(provider)
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Deterministic offline feature hashing.
    Hashing,
}

/// Query-time retrieval policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of documents requested from the index.
    pub top_k: usize,

    /// Hits scoring below this cosine similarity are dropped.
    pub min_score: f32,

    /// Bound on the query embedding call.
    pub embed_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.2,
            embed_timeout_secs: 15,
        }
    }
}

impl RetrievalConfig {
    /// Set the number of documents to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum relevance score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Set the embedding timeout.
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RetrievalError::Config("top_k must be at least 1".to_string()));
        }
        if !(-1.0..=1.0).contains(&self.min_score) {
            return Err(RetrievalError::Config(format!(
                "min_score must lie in [-1, 1], got {}",
                self.min_score
            )));
        }
        if self.embed_timeout_secs == 0 {
            return Err(RetrievalError::Config(
                "embed_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Smallest accepted context budget, in characters.
pub const MIN_CONTEXT_CHARS: usize = 256;

/// Context assembly budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum context length in characters, headers and separators included.
    pub max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_chars: 12_000 }
    }
}

impl ContextConfig {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chars < MIN_CONTEXT_CHARS {
            return Err(RetrievalError::Config(format!(
                "context max_chars must be at least {MIN_CONTEXT_CHARS}, got {}",
                self.max_chars
            )));
        }
        Ok(())
    }
}
