//! Query-time retrieval: embed, search, apply the relevance cutoff.

use std::sync::Arc;

use courtside_embeddings::{EmbeddingProvider, EmbeddingRequest, ScoredDocument};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::handle::IndexHandle;

/// Ranked documents for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,

    /// Hits in non-increasing score order, all at or above the cutoff.
    pub hits: Vec<ScoredDocument>,

    /// Hits returned by the index but dropped by the cutoff.
    pub below_cutoff: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn top(&self) -> Option<&ScoredDocument> {
        self.hits.first()
    }
}

/// Wraps the index with query-time policy.
pub struct Retriever {
    index: IndexHandle,
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        index: IndexHandle,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Retrieve up to `k` documents scoring at or above the cutoff.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.retrieve_with_cancel(query, k, &CancellationToken::new())
            .await
    }

    /// Like [`Retriever::retrieve`], aborting when `cancel` fires.
    ///
    /// An empty index yields an empty result without calling the provider.
    /// Embedding failures and timeouts are returned as errors.
    pub async fn retrieve_with_cancel(
        &self,
        query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult> {
        let snapshot = self.index.snapshot().await;

        let provider_tag = self.provider.tag();
        if snapshot.tag() != &provider_tag {
            return Err(RetrievalError::ProviderMismatch {
                index: snapshot.tag().clone(),
                provider: provider_tag,
            });
        }

        if snapshot.is_empty() {
            debug!("Index is empty; nothing to retrieve");
            return Ok(RetrievalResult {
                query: query.to_string(),
                hits: Vec::new(),
                below_cutoff: 0,
            });
        }

        let timeout = self.config.embed_timeout();
        let request = EmbeddingRequest::new(query);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
            result = tokio::time::timeout(timeout, self.provider.embed(request)) => {
                result.map_err(|_| RetrievalError::Timeout(timeout))??
            }
        };

        let candidates = snapshot.search(&response.embedding, k)?;
        let total = candidates.len();
        let hits: Vec<ScoredDocument> = candidates
            .into_iter()
            .filter(|hit| hit.score >= self.config.min_score)
            .collect();

        debug!(
            "Retrieved {} of {total} candidates at or above {:.3}",
            hits.len(),
            self.config.min_score
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            below_cutoff: total - hits.len(),
            hits,
        })
    }
}
