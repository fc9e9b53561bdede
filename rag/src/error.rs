//! Error types for answering and index building.

use std::time::Duration;

use courtside_documents::DocumentError;
use courtside_embeddings::EmbeddingError;
use courtside_retrieval::RetrievalError;
use thiserror::Error;

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors from the external generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Provider not configured.
    #[error("generation provider not configured")]
    NotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The service did not answer in time.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors that can occur while answering a query or building an index.
#[derive(Error, Debug)]
pub enum RagError {
    /// No document cleared the relevance cutoff.
    #[error("no relevant data found for query: {query}")]
    NoRelevantData { query: String },

    /// Retrieval could not run (embedding failure, timeout, index mismatch).
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// The generation service failed or timed out.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The query is empty.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding or index error outside of a query.
    #[error("index error: {0}")]
    Index(#[from] EmbeddingError),

    /// Record loading error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether the failure happened before any generation was attempted
    /// because no grounded context could be produced.
    pub fn is_retrieval_failure(&self) -> bool {
        matches!(self, Self::NoRelevantData { .. } | Self::Retrieval(_))
    }

    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::Generation(_))
    }

    /// Whether the persisted index is incompatible with the configured
    /// embedding provider.
    pub fn is_index_mismatch(&self) -> bool {
        match self {
            Self::Index(err) => err.is_index_mismatch(),
            Self::Retrieval(RetrievalError::ProviderMismatch { .. }) => true,
            Self::Retrieval(RetrievalError::Embedding(err)) => err.is_index_mismatch(),
            _ => false,
        }
    }
}
