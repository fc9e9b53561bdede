//! In-memory embedding cache, mainly for repeated query texts.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, ProviderTag};

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Embedding>,
    /// Keys in insertion order; the front is evicted first.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

/// Bounded cache from (model, text) to embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    state: Arc<RwLock<CacheState>>,
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a cache holding at most `max_entries` embeddings.
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            max_entries,
        }
    }

    fn hash_key(text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str, model: &str) -> Option<Embedding> {
        let key = Self::hash_key(text, model);
        let mut state = self.state.write().await;
        let found = state.entries.get(&key).cloned();
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        found
    }

    /// Put an embedding in the cache, evicting the oldest entry when full.
    pub async fn put(&self, text: &str, model: &str, embedding: Embedding) {
        if self.max_entries == 0 {
            return;
        }
        let key = Self::hash_key(text, model);
        let mut state = self.state.write().await;

        if state.entries.insert(key.clone(), embedding).is_some() {
            return;
        }
        state.order.push_back(key);
        while state.order.len() > self.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
            }
        }
        debug!("Cached embedding (model: {model})");
    }

    /// Check if an embedding is cached.
    pub async fn contains(&self, text: &str, model: &str) -> bool {
        let key = Self::hash_key(text, model);
        self.state.read().await.entries.contains_key(&key)
    }

    /// Clear the entire cache.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.order.clear();
        info!("Cleared embedding cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            entries: state.entries.len(),
            max_entries: self.max_entries,
            hits: state.hits,
            misses: state.misses,
        }
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// A provider that answers repeated texts from an [`EmbeddingCache`].
///
/// Only successful responses are stored, so a failed or cancelled call
/// leaves the cache untouched.
pub struct CachedProvider<P> {
    provider: P,
    cache: EmbeddingCache,
}

impl<P: EmbeddingProvider> CachedProvider<P> {
    pub fn new(provider: P, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }

    fn model_for(&self, request: &EmbeddingRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }
}

fn cached_response(embedding: Embedding, model: String) -> EmbeddingResponse {
    EmbeddingResponse {
        dimension: embedding.len(),
        embedding,
        model,
        tokens_used: None,
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn default_model(&self) -> &str {
        self.provider.default_model()
    }

    fn default_dimension(&self) -> usize {
        self.provider.default_dimension()
    }

    fn tag(&self) -> ProviderTag {
        self.provider.tag()
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = self.model_for(&request);

        if let Some(embedding) = self.cache.get(&request.text, &model).await {
            debug!("Cache hit for embedding");
            return Ok(cached_response(embedding, model));
        }

        let text = request.text.clone();
        let response = self.provider.embed(request).await?;
        self.cache
            .put(&text, &model, response.embedding.clone())
            .await;
        Ok(response)
    }

    /// Answers cached texts locally and sends every miss to the inner
    /// provider in a single batch.
    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let mut slots: Vec<Option<EmbeddingResponse>> = Vec::with_capacity(requests.len());
        let mut misses = Vec::new();
        let mut miss_keys = Vec::new();

        for request in requests {
            let model = self.model_for(&request);
            match self.cache.get(&request.text, &model).await {
                Some(embedding) => slots.push(Some(cached_response(embedding, model))),
                None => {
                    miss_keys.push((slots.len(), request.text.clone(), model));
                    slots.push(None);
                    misses.push(request);
                }
            }
        }

        if !misses.is_empty() {
            debug!(
                "Embedding batch: {} cached, {} sent to {}",
                slots.len() - misses.len(),
                misses.len(),
                self.provider.name()
            );
            let fresh = self.provider.embed_batch(misses).await?;
            if fresh.len() != miss_keys.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    miss_keys.len(),
                    fresh.len()
                )));
            }
            for ((slot, text, model), response) in miss_keys.into_iter().zip(fresh) {
                self.cache
                    .put(&text, &model, response.embedding.clone())
                    .await;
                slots[slot] = Some(response);
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| {
                    EmbeddingError::InvalidResponse("missing embedding in batch".to_string())
                })
            })
            .collect()
    }

    fn is_available(&self) -> bool {
        self.provider.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{HashingProvider, OpenAIProvider};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = EmbeddingCache::new(100);
        let embedding = vec![1.0, 2.0, 3.0];

        cache.put("hello", "model-1", embedding.clone()).await;

        assert_eq!(cache.get("hello", "model-1").await, Some(embedding));
        assert!(cache.get("hello", "model-2").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_eviction_drops_oldest() {
        let cache = EmbeddingCache::new(2);

        cache.put("a", "model", vec![1.0]).await;
        cache.put("b", "model", vec![2.0]).await;
        cache.put("c", "model", vec![3.0]).await;

        assert!(!cache.contains("a", "model").await);
        assert!(cache.contains("b", "model").await);
        assert!(cache.contains("c", "model").await);
        assert_eq!(cache.stats().await.entries, 2);
    }

    /// Counts calls and fails on demand.
    struct CountingProvider {
        inner: HashingProvider,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn default_model(&self) -> &str {
            "count-v1"
        }

        fn default_dimension(&self) -> usize {
            self.inner.default_dimension()
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbeddingError::ApiRequest("boom".to_string()));
            }
            self.inner.embed(request).await
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_cached_provider_reuses_embeddings() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: HashingProvider::new(16),
                calls: AtomicUsize::new(0),
                fail: false,
            },
            EmbeddingCache::new(10),
        );

        let first = provider.embed(EmbeddingRequest::new("Celtics")).await.unwrap();
        let second = provider.embed(EmbeddingRequest::new("Celtics")).await.unwrap();

        assert_eq!(first.embedding, second.embedding);
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cache().stats().await.hits, 1);
        assert_eq!(provider.tag().provider, "counting");
    }

    #[tokio::test]
    async fn test_failed_call_is_not_cached() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: HashingProvider::new(16),
                calls: AtomicUsize::new(0),
                fail: true,
            },
            EmbeddingCache::new(10),
        );

        assert!(provider.embed(EmbeddingRequest::new("Knicks")).await.is_err());
        assert!(provider.embed(EmbeddingRequest::new("Knicks")).await.is_err());
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cache().stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_batch_sends_one_request_for_all_misses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [1.0, 0.0], "index": 0},
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 1.0], "index": 2}
                ],
                "model": "text-embedding-3-small"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = CachedProvider::new(
            OpenAIProvider::new()
                .with_api_key("k")
                .with_base_url(server.uri())
                .with_dimensions(2),
            EmbeddingCache::new(10),
        );

        let responses = provider
            .embed_batch(vec![
                EmbeddingRequest::new("Lakers"),
                EmbeddingRequest::new("Celtics"),
                EmbeddingRequest::new("Heat"),
            ])
            .await
            .unwrap();

        let vectors: Vec<Embedding> = responses.into_iter().map(|r| r.embedding).collect();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        assert_eq!(provider.cache().stats().await.entries, 3);
        assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_only_embeds_uncached_texts() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: HashingProvider::new(16),
                calls: AtomicUsize::new(0),
                fail: false,
            },
            EmbeddingCache::new(10),
        );
        let warm = provider.embed(EmbeddingRequest::new("Spurs")).await.unwrap();

        let responses = provider
            .embed_batch(vec![
                EmbeddingRequest::new("Knicks"),
                EmbeddingRequest::new("Spurs"),
                EmbeddingRequest::new("Nets"),
            ])
            .await
            .unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[1].embedding, warm.embedding);
        assert_eq!(
            responses[0].embedding,
            HashingProvider::new(16).embed_text("Knicks")
        );
        assert_eq!(
            responses[2].embedding,
            HashingProvider::new(16).embed_text("Nets")
        );
        // One warm-up call plus one per miss through the default batch path.
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_cached() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: HashingProvider::new(16),
                calls: AtomicUsize::new(0),
                fail: true,
            },
            EmbeddingCache::new(10),
        );

        let result = provider
            .embed_batch(vec![EmbeddingRequest::new("a"), EmbeddingRequest::new("b")])
            .await;
        assert!(result.is_err());
        assert_eq!(provider.cache().stats().await.entries, 0);
    }
}
