//! Error types for the embeddings system.

use thiserror::Error;

use crate::provider::ProviderTag;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The provider did not answer in time.
    #[error("embedding request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted index was produced by a different provider, model, or
    /// dimension than the one it is being loaded for.
    #[error("index mismatch: index was built with {found}, expected {expected}")]
    IndexMismatch {
        expected: ProviderTag,
        found: ProviderTag,
    },

    /// Persisted index uses a format this build cannot read.
    #[error("unsupported index format version {found} (supported: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },

    /// A document id is already present in the index.
    #[error("duplicate document id: {0}")]
    DuplicateDocument(String),

    /// `k` must be at least one.
    #[error("invalid result count k={0}; k must be at least 1")]
    InvalidK(usize),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether the error describes an incompatible persisted index.
    pub fn is_index_mismatch(&self) -> bool {
        matches!(
            self,
            Self::IndexMismatch { .. } | Self::UnsupportedFormat { .. } | Self::DimensionMismatch { .. }
        )
    }
}
