//! # Embeddings
//!
//! Dense vector embeddings for courtside documents and the index that
//! searches them.
//!
//! ## Features
//!
//! - **Embedding Generation**: OpenAI-compatible HTTP provider, plus a
//!   deterministic hashing provider for offline use
//! - **Vector Index**: cosine-similarity top-k over normalized vectors
//! - **Persistence**: indexes are stamped with the provider that built them
//!   and refuse to load under a different one
//! - **Caching**: repeated texts are answered without a provider call
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► VectorIndex               │
//! │       │                                  │                      │
//! │       ▼                                  ▼                      │
//! │  OpenAI / Hashing / Cached         save / load (ProviderTag)    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use cache::{CacheStats, CachedProvider, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use index::{INDEX_FORMAT_VERSION, IndexEntry, ScoredDocument, VectorIndex};
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashingProvider, OpenAIProvider,
    ProviderTag,
};
pub use similarity::{cosine_similarity, dot_product, normalize};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of `text-embedding-3-small`.
pub const DEFAULT_DIMENSION: usize = 1536;
