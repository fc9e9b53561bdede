//! Builds vector indexes from record corpora.
//!
//! A rebuild reuses the vectors of documents whose content hash is unchanged
//! in a compatible previous index, so only new or edited documents reach the
//! embedding provider.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use courtside_documents::{
    BuildFailure, BuilderConfig, Corpus, CorpusBuilder, Document, RecordKind, RecordSource,
};
use courtside_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, EmbeddingRequest, VectorIndex,
};
use courtside_retrieval::IndexHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Summary of one index build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexBuildReport {
    /// Documents in the new index.
    pub documents: usize,

    /// Documents sent to the embedding provider.
    pub embedded: usize,

    /// Documents whose vector was carried over from the previous index.
    pub reused: usize,

    /// Records that failed to build and were skipped.
    pub skipped_records: usize,

    pub failures: Vec<BuildFailure>,

    pub by_kind: BTreeMap<RecordKind, usize>,
}

/// Turns a corpus into a [`VectorIndex`].
pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    documents: CorpusBuilder,
    batch_size: usize,
    timeout: Duration,
}

impl IndexBuilder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            documents: CorpusBuilder::new(),
            batch_size: 64,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_builder_config(mut self, config: BuilderConfig) -> Self {
        self.documents = CorpusBuilder::with_config(config);
        self
    }

    /// Documents per embedding request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Bound on each embedding batch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build an index for `corpus`.
    ///
    /// `previous` is only consulted when it was built by the same provider;
    /// an incompatible one is ignored with a warning.
    pub async fn build(
        &self,
        corpus: &Corpus,
        previous: Option<&VectorIndex>,
    ) -> Result<(VectorIndex, IndexBuildReport)> {
        let built = self.documents.build(corpus);
        let tag = self.provider.tag();

        let previous = previous.filter(|index| {
            let compatible = index.tag() == &tag;
            if !compatible {
                warn!(
                    "Previous index was built with {}; re-embedding everything with {tag}",
                    index.tag()
                );
            }
            compatible
        });

        let mut vectors: Vec<Option<Embedding>> = Vec::with_capacity(built.documents.len());
        let mut pending: Vec<usize> = Vec::new();
        for (position, document) in built.documents.iter().enumerate() {
            let reused = previous
                .and_then(|index| index.vector_for(&document.id, &document.content_hash()))
                .map(<[f32]>::to_vec);
            if reused.is_none() {
                pending.push(position);
            }
            vectors.push(reused);
        }

        let reused = built.documents.len() - pending.len();
        info!(
            "Embedding {} of {} documents ({reused} reused)",
            pending.len(),
            built.documents.len()
        );

        for batch in pending.chunks(self.batch_size) {
            let documents: Vec<&Document> = batch.iter().map(|&i| &built.documents[i]).collect();
            let embeddings = self.embed_batch(&documents).await?;
            for (&position, embedding) in batch.iter().zip(embeddings) {
                vectors[position] = Some(embedding);
            }
            debug!("Embedded batch of {} documents", batch.len());
        }

        let report = IndexBuildReport {
            documents: built.documents.len(),
            embedded: pending.len(),
            reused,
            skipped_records: built.skipped,
            by_kind: built.counts_by_kind(),
            failures: built.failures,
        };

        let mut index = VectorIndex::new(tag);
        for (document, vector) in built.documents.into_iter().zip(vectors) {
            let vector = vector.ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!("no embedding for {}", document.id))
            })?;
            index.add(document, vector)?;
        }

        info!(
            "Built index with {} documents ({} skipped records)",
            report.documents, report.skipped_records
        );
        Ok((index, report))
    }

    async fn embed_batch(&self, documents: &[&Document]) -> Result<Vec<Embedding>> {
        let requests = documents
            .iter()
            .map(|doc| EmbeddingRequest::new(doc.text.as_str()))
            .collect();

        let responses = tokio::time::timeout(self.timeout, self.provider.embed_batch(requests))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))??;

        if responses.len() != documents.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                responses.len()
            ))
            .into());
        }
        Ok(responses.into_iter().map(|r| r.embedding).collect())
    }

    /// Load the corpus from `source`, rebuild against the handle's current
    /// index, persist to `path`, and swap the result in.
    ///
    /// In-flight queries keep searching the old snapshot until the swap.
    pub async fn refresh(
        &self,
        source: &dyn RecordSource,
        handle: &IndexHandle,
        path: Option<&Path>,
    ) -> Result<IndexBuildReport> {
        info!("Loading records from {}", source.describe());
        let corpus = source.load_all().await?;

        let current = handle.snapshot().await;
        let (index, report) = self.build(&corpus, Some(current.as_ref())).await?;

        if let Some(path) = path {
            index.save(path).await?;
        }
        handle.swap(index).await;
        Ok(report)
    }
}

/// Load the index at `path` for reuse, or `None` when absent or incompatible.
pub async fn load_previous(path: &Path, provider: &dyn EmbeddingProvider) -> Option<VectorIndex> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return None;
    }
    match VectorIndex::load(path, &provider.tag()).await {
        Ok(index) => Some(index),
        Err(err) => {
            warn!("Ignoring previous index at {}: {err}", path.display());
            None
        }
    }
}
