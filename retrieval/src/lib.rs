//! # Retrieval
//!
//! Query-time side of the courtside pipeline:
//!
//! - **Index handle**: the current vector index as an immutable snapshot that
//!   rebuilds can swap atomically
//! - **Retriever**: embeds the query, searches, applies the relevance cutoff
//! - **Context assembly**: bounded prompt context with per-source attribution
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Retrieval                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  query ──► EmbeddingProvider ──► IndexHandle::snapshot()        │
//! │                                         │                       │
//! │                                         ▼                       │
//! │                               VectorIndex::search (top k)       │
//! │                                         │                       │
//! │                                         ▼                       │
//! │                               min_score cutoff                  │
//! │                                         │                       │
//! │                                         ▼                       │
//! │                ContextAssembler ──► context + sources           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courtside_retrieval::{ContextAssembler, IndexHandle, Retriever};
//!
//! let handle = IndexHandle::load(&path, &provider.tag()).await?;
//! let retriever = Retriever::new(handle, provider, RetrievalConfig::default());
//! let result = retriever.retrieve("How many games did the Lakers win in 2020?", 5).await?;
//! let context = ContextAssembler::default().assemble(&result);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod handle;
pub mod retriever;

pub use config::{
    ContextConfig, EmbeddingConfig, EmbeddingProviderType, MIN_CONTEXT_CHARS, RetrievalConfig,
};
pub use context::{AssembledContext, ContextAssembler, SourceAttribution};
pub use error::{Result, RetrievalError};
pub use handle::IndexHandle;
pub use retriever::{RetrievalResult, Retriever};

// Re-export from dependencies for convenience
pub use courtside_embeddings::{EmbeddingProvider, ProviderTag, ScoredDocument, VectorIndex};
