//! End-to-end answering scenarios with the offline embedding provider and a
//! scripted generation provider.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use courtside_documents::{Corpus, Document, RecordKind, TeamRecord, TeamSeason};
use courtside_embeddings::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashingProvider, VectorIndex,
};
use courtside_rag::{
    GenerationConfig, GenerationError, GenerationProvider, GenerationRequest, GenerationResponse,
    IndexBuilder, RagAgent, RagError,
};
use courtside_retrieval::{
    ContextAssembler, ContextConfig, IndexHandle, RetrievalConfig, RetrievalError, Retriever,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy)]
enum Script {
    Echo,
    Fail,
    Hang,
}

/// Generation provider that records every request.
struct ScriptedGenerator {
    script: Script,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-v1"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let question = request
            .user
            .rsplit("Question: ")
            .next()
            .unwrap_or_default()
            .to_string();
        self.requests.lock().unwrap().push(request);
        match self.script {
            Script::Echo => Ok(GenerationResponse {
                text: format!("Answer to: {question} [Source 1]"),
                model: "scripted-v1".to_string(),
                tokens_used: None,
            }),
            Script::Fail => Err(GenerationError::ApiRequest("quota exceeded".to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(300)).await;
                Err(GenerationError::InvalidResponse("unreachable".to_string()))
            }
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Embedding provider that never answers in time.
struct StalledEmbedder(HashingProvider);

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn default_model(&self) -> &str {
        self.0.default_model()
    }

    fn default_dimension(&self) -> usize {
        self.0.default_dimension()
    }

    async fn embed(&self, request: EmbeddingRequest) -> courtside_embeddings::Result<EmbeddingResponse> {
        tokio::time::sleep(Duration::from_secs(300)).await;
        self.0.embed(request).await
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn index_of(texts: &[(&str, RecordKind, &str)]) -> VectorIndex {
    let provider = HashingProvider::default();
    let mut index = VectorIndex::new(provider.tag());
    for (id, kind, text) in texts {
        index
            .add(Document::new(*id, *kind, *id, *text), provider.embed_text(text))
            .unwrap();
    }
    index
}

fn agent_with(
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<ScriptedGenerator>,
    retrieval: RetrievalConfig,
    generation: GenerationConfig,
) -> RagAgent {
    RagAgent::new(
        Retriever::new(IndexHandle::new(index), embedder, retrieval),
        ContextAssembler::new(ContextConfig::default()),
        generator,
        generation,
    )
}

fn agent(index: VectorIndex, generator: Arc<ScriptedGenerator>) -> RagAgent {
    agent_with(
        index,
        Arc::new(HashingProvider::default()),
        generator,
        RetrievalConfig::default(),
        GenerationConfig::default(),
    )
}

fn lakers_corpus(wins_2020: u32) -> Corpus {
    Corpus {
        teams: vec![
            TeamRecord {
                abbreviation: "LAL".to_string(),
                name: "Los Angeles Lakers".to_string(),
                city: Some("Los Angeles".to_string()),
                founded_year: Some(1947),
                seasons: vec![
                    TeamSeason {
                        season: 2019,
                        wins: 37,
                        losses: 45,
                        ..Default::default()
                    },
                    TeamSeason {
                        season: 2020,
                        wins: wins_2020,
                        losses: 19,
                        playoff_result: Some("Won Finals".to_string()),
                        champion: true,
                    },
                ],
                ..Default::default()
            },
            TeamRecord {
                abbreviation: "BOS".to_string(),
                name: "Boston Celtics".to_string(),
                city: Some("Boston".to_string()),
                founded_year: Some(1946),
                ..Default::default()
            },
            // No identity: skipped and counted.
            TeamRecord::default(),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_team_document_is_the_only_source() {
    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = agent(
        index_of(&[("LAL", RecordKind::Team, "Lakers won 52 games in 2020")]),
        generator.clone(),
    );

    let answer = agent
        .answer("How many games did the Lakers win in 2020?")
        .await
        .unwrap();

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].doc_type, RecordKind::Team);
    assert_eq!(answer.sources[0].source_id, "LAL");
    assert_eq!(
        answer.analysis,
        "Answer to: How many games did the Lakers win in 2020? [Source 1]"
    );

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user.contains("[Source 1] team LAL\nLakers won 52 games in 2020"));
    assert!(requests[0].system.contains("basketball statistics analyst"));
    assert_eq!(requests[0].temperature, 0.3);
    assert_eq!(requests[0].max_tokens, 1000);
}

#[tokio::test]
async fn test_empty_corpus_is_a_retrieval_failure() {
    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = agent(VectorIndex::new(HashingProvider::default().tag()), generator.clone());

    let err = agent.answer("Who won the 2016 title?").await.unwrap_err();
    assert!(matches!(err, RagError::NoRelevantData { .. }));
    assert!(err.is_retrieval_failure());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_nothing_above_cutoff_is_a_retrieval_failure() {
    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = agent(
        index_of(&[("LAL", RecordKind::Team, "Lakers won 52 games in 2020")]),
        generator.clone(),
    );

    let err = agent.answer("curling").await.unwrap_err();
    assert!(err.is_retrieval_failure());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_embedding_timeout_skips_generation() {
    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = agent_with(
        index_of(&[("LAL", RecordKind::Team, "Lakers won 52 games in 2020")]),
        Arc::new(StalledEmbedder(HashingProvider::default())),
        generator.clone(),
        RetrievalConfig::default().with_embed_timeout(Duration::from_secs(1)),
        GenerationConfig::default(),
    );
    let before = agent.index().snapshot().await;

    let err = agent.answer("Lakers 2020").await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Retrieval(RetrievalError::Timeout(_))
    ));
    assert!(err.is_retrieval_failure());
    assert_eq!(generator.calls(), 0);
    assert!(Arc::ptr_eq(&before, &agent.index().snapshot().await));
}

#[tokio::test]
async fn test_generation_failure_is_distinct() {
    let generator = ScriptedGenerator::new(Script::Fail);
    let agent = agent(
        index_of(&[("LAL", RecordKind::Team, "Lakers won 52 games in 2020")]),
        generator.clone(),
    );

    let err = agent.answer("Lakers 2020").await.unwrap_err();
    assert!(err.is_generation_failure());
    assert!(!err.is_retrieval_failure());
    assert!(err.to_string().contains("quota exceeded"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_generation_timeout() {
    let generator = ScriptedGenerator::new(Script::Hang);
    let agent = agent_with(
        index_of(&[("LAL", RecordKind::Team, "Lakers won 52 games in 2020")]),
        Arc::new(HashingProvider::default()),
        generator,
        RetrievalConfig::default(),
        GenerationConfig {
            timeout_secs: 1,
            ..GenerationConfig::default()
        },
    );

    let err = agent.answer("Lakers 2020").await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Generation(GenerationError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_cancellation_discards_the_answer() {
    let generator = ScriptedGenerator::new(Script::Hang);
    let agent = agent(
        index_of(&[("LAL", RecordKind::Team, "Lakers won 52 games in 2020")]),
        generator.clone(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = agent
        .answer_with_cancel("Lakers 2020", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Cancelled));
    assert_eq!(generator.calls(), 1);
    assert_eq!(agent.index().len().await, 1);
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = agent(index_of(&[]), generator.clone());
    assert!(matches!(
        agent.answer("   ").await,
        Err(RagError::InvalidQuery(_))
    ));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_answers_do_not_interfere() {
    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = Arc::new(agent(
        index_of(&[
            ("LAL", RecordKind::Team, "Lakers won 52 games in 2020"),
            (
                "BOS",
                RecordKind::Team,
                "Boston Celtics franchise founded 1946 with 17 championships",
            ),
        ]),
        generator.clone(),
    ));

    let lakers = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move {
            agent
                .answer("How many games did the Lakers win in 2020?")
                .await
        })
    };
    let celtics = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.answer("Celtics championships").await })
    };

    let lakers = lakers.await.unwrap().unwrap();
    let celtics = celtics.await.unwrap().unwrap();

    assert_eq!(lakers.sources[0].source_id, "LAL");
    assert_eq!(celtics.sources[0].source_id, "BOS");
    assert!(lakers.analysis.contains("Lakers"));
    assert!(celtics.analysis.contains("Celtics"));
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_answer_from_built_corpus() {
    let provider = Arc::new(HashingProvider::default());
    let (index, report) = IndexBuilder::new(provider.clone())
        .build(&lakers_corpus(52), None)
        .await
        .unwrap();

    // LAL profile + 2 seasons, BOS profile.
    assert_eq!(report.documents, 4);
    assert_eq!(report.skipped_records, 1);
    assert_eq!(report.embedded, 4);

    let generator = ScriptedGenerator::new(Script::Echo);
    let agent = agent(index, generator);
    let answer = agent
        .answer("How many games did the Lakers win in 2020?")
        .await
        .unwrap();

    assert_eq!(answer.sources[0].doc_type, RecordKind::Team);
    assert_eq!(
        answer.sources[0].metadata["document_id"],
        serde_json::json!("team:LAL:season:2020")
    );
    assert!(answer.sources.iter().all(|s| s.source_id == "LAL"));
}

#[tokio::test]
async fn test_rebuild_is_idempotent_and_reuses_vectors() {
    let builder = IndexBuilder::new(Arc::new(HashingProvider::default())).with_batch_size(2);

    let (first, _) = builder.build(&lakers_corpus(52), None).await.unwrap();
    let (second, report) = builder
        .build(&lakers_corpus(52), Some(&first))
        .await
        .unwrap();

    assert_eq!(report.reused, report.documents);
    assert_eq!(report.embedded, 0);
    let ids = |index: &VectorIndex| -> Vec<String> {
        index.documents().map(|d| d.id.clone()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    for (a, b) in first.entries().zip(second.entries()) {
        assert_eq!(a.content_hash, b.content_hash);
        for (x, y) in a.embedding.iter().zip(&b.embedding) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    // Changing one season only re-embeds that season's document.
    let (_, report) = builder
        .build(&lakers_corpus(53), Some(&second))
        .await
        .unwrap();
    assert_eq!(report.embedded, 1);
    assert_eq!(report.reused, 3);
}

#[tokio::test]
async fn test_incompatible_previous_index_is_ignored() {
    let builder = IndexBuilder::new(Arc::new(HashingProvider::new(64)));
    let (previous, _) = IndexBuilder::new(Arc::new(HashingProvider::new(32)))
        .build(&lakers_corpus(52), None)
        .await
        .unwrap();

    let (index, report) = builder
        .build(&lakers_corpus(52), Some(&previous))
        .await
        .unwrap();
    assert_eq!(report.reused, 0);
    assert_eq!(report.embedded, 4);
    assert_eq!(index.dimension(), 64);
}

#[tokio::test]
async fn test_refresh_persists_and_swaps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let provider = Arc::new(HashingProvider::default());
    let handle = IndexHandle::empty(provider.tag());

    let report = IndexBuilder::new(provider.clone())
        .refresh(
            &courtside_documents::StaticRecordSource::new(lakers_corpus(52)),
            &handle,
            Some(&path),
        )
        .await
        .unwrap();

    assert_eq!(report.documents, 4);
    assert_eq!(handle.len().await, 4);

    let loaded = courtside_rag::load_previous(&path, provider.as_ref())
        .await
        .unwrap();
    assert_eq!(loaded.len(), 4);
    assert!(
        courtside_rag::load_previous(&path, &HashingProvider::new(8))
            .await
            .is_none()
    );
}
