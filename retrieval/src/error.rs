//! Error types for query-time retrieval.

use std::time::Duration;

use courtside_embeddings::{EmbeddingError, ProviderTag};
use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while retrieving documents for a query.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding or index error.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The query embedding did not arrive in time.
    #[error("query embedding timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the request.
    #[error("retrieval cancelled")]
    Cancelled,

    /// The loaded index was built by a different provider than the one
    /// embedding queries.
    #[error("index built with {index} cannot be queried with {provider}")]
    ProviderMismatch {
        index: ProviderTag,
        provider: ProviderTag,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
