//! courtside - ask questions about basketball statistics
//!
//! # Commands
//!
//! ```bash
//! # Build (or incrementally rebuild) the index from a record export
//! courtside index --records demos/corpus.json
//!
//! # Ask a question
//! courtside ask "How many games did the Lakers win in 2020?"
//!
//! # Show what the persisted index contains
//! courtside inspect
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courtside_documents::{JsonRecordSource, RecordSource};
use courtside_embeddings::VectorIndex;
use courtside_rag::{IndexBuilder, RagAgent, RagConfig, RagError, load_previous};
use courtside_retrieval::{EmbeddingProviderType, IndexHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "courtside")]
#[command(about = "Retrieval-augmented answers over basketball statistics")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the index location
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Use the offline hashing embedder instead of the embeddings API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from a JSON record export
    Index {
        /// Record export with `teams`, `players`, `games` and `coaches`
        #[arg(long)]
        records: PathBuf,

        /// Re-embed every document instead of reusing unchanged vectors
        #[arg(long)]
        full: bool,
    },

    /// Answer a question from the index
    Ask {
        /// The question
        question: String,

        /// Number of documents to retrieve
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show provider, dimension and document counts of the index
    Inspect,
}

async fn load_config(cli: &Cli) -> Result<RagConfig> {
    let mut config = RagConfig::load_or_default(cli.config.as_deref()).await?;
    if cli.offline {
        config.embedding.provider = EmbeddingProviderType::Hashing;
    }
    if let Some(index) = &cli.index {
        config.index_path.clone_from(index);
    }
    Ok(config)
}

async fn run_index(config: &RagConfig, records: PathBuf, full: bool) -> Result<ExitCode> {
    let embedder = config.embedding.build_provider();
    let previous = if full {
        None
    } else {
        load_previous(&config.index_path, embedder.as_ref()).await
    };

    let source = JsonRecordSource::new(records);
    info!("Loading records from {}", source.describe());
    let corpus = source.load_all().await?;

    let builder = IndexBuilder::new(embedder)
        .with_builder_config(config.documents.clone())
        .with_batch_size(config.embedding.batch_size)
        .with_timeout(config.embedding.batch_timeout());
    let (index, report) = builder.build(&corpus, previous.as_ref()).await?;

    index
        .save(&config.index_path)
        .await
        .with_context(|| format!("failed to write {}", config.index_path.display()))?;

    println!("Indexed {} documents into {}", report.documents, config.index_path.display());
    println!("  Embedded: {}", report.embedded);
    println!("  Reused:   {}", report.reused);
    for (kind, count) in &report.by_kind {
        println!("  {kind:<8} {count}");
    }
    if report.skipped_records > 0 {
        println!("Skipped {} records:", report.skipped_records);
        for failure in &report.failures {
            println!(
                "  {} {}: {}",
                failure.kind,
                failure.source_id.as_deref().unwrap_or("<unknown>"),
                failure.reason
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Exit status when no document clears the relevance cutoff.
const NO_RELEVANT_DATA: u8 = 2;

/// Failures reported as a plain message and exit status rather than an
/// error trace.
fn quiet_failure(err: &RagError) -> Option<u8> {
    match err {
        RagError::NoRelevantData { .. } => Some(NO_RELEVANT_DATA),
        _ => None,
    }
}

async fn run_ask(
    config: &RagConfig,
    question: &str,
    k: Option<usize>,
    json: bool,
) -> Result<ExitCode> {
    let tag = config.embedding.build_provider().tag();
    let handle = IndexHandle::load(&config.index_path, &tag)
        .await
        .with_context(|| {
            format!(
                "could not load index at {}; run `courtside index` first",
                config.index_path.display()
            )
        })?;
    let agent = RagAgent::from_config(config, handle);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let k = k.unwrap_or(config.retrieval.top_k);
    let answer = match agent.answer_top_k(question, k, &cancel).await {
        Ok(answer) => answer,
        Err(err) => match quiet_failure(&err) {
            Some(status) => {
                println!("No relevant data found for that question.");
                return Ok(ExitCode::from(status));
            }
            None => return Err(err.into()),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}\n", answer.analysis);
    println!("Sources:");
    for (i, source) in answer.sources.iter().enumerate() {
        let document = source
            .metadata
            .get("document_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let truncated = if source.is_truncated() { " (truncated)" } else { "" };
        println!(
            "  [{}] {} {} score {:.3} {document}{truncated}",
            i + 1,
            source.doc_type,
            source.source_id,
            source.relevance_score
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_inspect(config: &RagConfig) -> Result<ExitCode> {
    let path = &config.index_path;
    let stored = VectorIndex::peek_tag(path)
        .await
        .with_context(|| format!("could not read index at {}", path.display()))?;
    let configured = config.embedding.build_provider().tag();

    println!("Index:     {}", path.display());
    println!("Provider:  {}", stored.provider);
    println!("Model:     {}", stored.model);
    println!("Dimension: {}", stored.dimension);

    if stored != configured {
        warn!("Index was built with {stored}; current configuration uses {configured}");
        println!("Not queryable with the current configuration ({configured}).");
        return Ok(ExitCode::SUCCESS);
    }

    let index = VectorIndex::load(path, &configured).await?;
    let mut counts = BTreeMap::new();
    for document in index.documents() {
        *counts.entry(document.doc_type).or_insert(0usize) += 1;
    }
    println!("Documents: {}", index.len());
    for (kind, count) in counts {
        println!("  {kind:<8} {count}");
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so `ask --json` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).await?;

    match cli.command {
        Commands::Index { records, full } => run_index(&config, records, full).await,
        Commands::Ask { question, k, json } => run_ask(&config, &question, k, json).await,
        Commands::Inspect => run_inspect(&config).await,
    }
}
