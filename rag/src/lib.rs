//! # RAG
//!
//! Answers natural-language questions about basketball statistics from an
//! indexed corpus, with every answer tied back to the documents it used.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          RagAgent                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   Idle ──► Retrieving ──► Assembling ──► Generating ──► Answer  │
//! │                │                              │                 │
//! │                ▼                              ▼                 │
//! │        NoRelevantData /               GenerationError           │
//! │        RetrievalError                                           │
//! └─────────────────────────────────────────────────────────────────┘
//!
//!   RecordSource ──► IndexBuilder ──► VectorIndex ──► IndexHandle::swap
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courtside_rag::{RagAgent, RagConfig};
//! use courtside_retrieval::IndexHandle;
//!
//! let config = RagConfig::load_or_default(None).await?;
//! let embedder = config.embedding.build_provider();
//! let handle = IndexHandle::load(&config.index_path, &embedder.tag()).await?;
//! let agent = RagAgent::from_config(&config, handle);
//!
//! let answer = agent.answer("How many games did the Lakers win in 2020?").await?;
//! ```

pub mod agent;
pub mod answer;
pub mod config;
pub mod error;
pub mod generation;
pub mod indexer;
pub mod prompt;

pub use agent::{RagAgent, Stage};
pub use answer::Answer;
pub use config::{GenerationConfig, RagConfig};
pub use error::{GenerationError, RagError, Result};
pub use generation::{
    GenerationProvider, GenerationRequest, GenerationResponse, OpenAIChatProvider,
};
pub use indexer::{IndexBuildReport, IndexBuilder, load_previous};
