//! The answering pipeline: retrieve, assemble, generate.

use std::fmt;
use std::sync::Arc;

use courtside_retrieval::{ContextAssembler, IndexHandle, RetrievalError, Retriever};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::answer::Answer;
use crate::config::{GenerationConfig, RagConfig};
use crate::error::{GenerationError, RagError, Result};
use crate::generation::{GenerationProvider, GenerationRequest};
use crate::prompt::{SYSTEM_PROMPT, user_message};

/// Where an `answer` call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Retrieving,
    Assembling,
    Generating,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Generating => "generating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Logs stage transitions for one call.
struct StageLog<'a> {
    query: &'a str,
    stage: Stage,
}

impl<'a> StageLog<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            query,
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, next: Stage) {
        debug!("answer: {} -> {next}", self.stage);
        self.stage = next;
    }

    fn fail(&mut self, err: RagError) -> RagError {
        warn!(
            "answer failed while {} for {:?}: {err}",
            self.stage, self.query
        );
        self.stage = Stage::Failed;
        err
    }
}

/// Answers questions from the indexed corpus.
///
/// Each call is independent; the only shared state is read access to the
/// index snapshot, so one agent can serve concurrent callers.
pub struct RagAgent {
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Arc<dyn GenerationProvider>,
    generation: GenerationConfig,
}

impl RagAgent {
    pub fn new(
        retriever: Retriever,
        assembler: ContextAssembler,
        generator: Arc<dyn GenerationProvider>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            retriever,
            assembler,
            generator,
            generation,
        }
    }

    /// Wire an agent from configuration around an already loaded index.
    pub fn from_config(config: &RagConfig, index: IndexHandle) -> Self {
        let embedder = config.embedding.build_provider();
        Self::new(
            Retriever::new(index, embedder, config.retrieval.clone()),
            ContextAssembler::new(config.context.clone()),
            config.generation.build_provider(),
            config.generation.clone(),
        )
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn index(&self) -> &IndexHandle {
        self.retriever.index()
    }

    /// Answer `query` using the configured `top_k`.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        self.answer_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Answer `query`, aborting when `cancel` fires.
    pub async fn answer_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let k = self.retriever.config().top_k;
        self.answer_top_k(query, k, cancel).await
    }

    /// Answer `query` from at most `k` retrieved documents.
    ///
    /// All or nothing: either a complete [`Answer`] or an error, never a
    /// partially filled answer. Generation is not retried.
    pub async fn answer_top_k(
        &self,
        query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let query = query.trim();
        let mut log = StageLog::new(query);
        if query.is_empty() {
            return Err(log.fail(RagError::InvalidQuery("query is empty".to_string())));
        }

        log.enter(Stage::Retrieving);
        let retrieved = match self.retriever.retrieve_with_cancel(query, k, cancel).await {
            Ok(result) => result,
            Err(RetrievalError::Cancelled) => return Err(log.fail(RagError::Cancelled)),
            Err(err) => return Err(log.fail(err.into())),
        };
        if retrieved.is_empty() {
            return Err(log.fail(RagError::NoRelevantData {
                query: query.to_string(),
            }));
        }

        log.enter(Stage::Assembling);
        let assembled = self.assembler.assemble(&retrieved);

        log.enter(Stage::Generating);
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_message(&assembled.context, query),
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        };
        let timeout = self.generation.timeout();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(log.fail(RagError::Cancelled)),
            result = tokio::time::timeout(timeout, self.generator.generate(request)) => {
                match result {
                    Ok(Ok(response)) => response,
                    Ok(Err(err)) => return Err(log.fail(err.into())),
                    Err(_) => return Err(log.fail(GenerationError::Timeout(timeout).into())),
                }
            }
        };

        log.enter(Stage::Succeeded);
        info!(
            "Answered {:?} from {} sources with {}",
            query,
            assembled.sources.len(),
            response.model
        );
        Ok(Answer::new(query, response.text, assembled.sources))
    }
}
