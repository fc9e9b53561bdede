//! Turns ranked documents into one bounded prompt context.
//!
//! Each retrieved document becomes a block:
//!
//! ```text
//! [Source 1] team LAL
//! Team: Los Angeles Lakers (abbreviation LAL)
//! ...
//! ```
//!
//! Blocks are separated by a blank line, and the source list keeps the same
//! order, so `[Source n]` in generated text maps to `sources[n - 1]`.

use courtside_documents::{Metadata, RecordKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ContextConfig;
use crate::retriever::RetrievalResult;

const BLOCK_SEPARATOR: &str = "\n\n";

/// Ties part of the context back to the document it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    #[serde(rename = "type")]
    pub doc_type: RecordKind,

    #[serde(rename = "id")]
    pub source_id: String,

    pub relevance_score: f32,

    /// Document metadata plus `document_id`, and `truncated` when the text
    /// was cut to fit the budget.
    pub metadata: Metadata,
}

impl SourceAttribution {
    pub fn is_truncated(&self) -> bool {
        self.metadata
            .get("truncated")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Output of [`ContextAssembler::assemble`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub context: String,

    /// One entry per block in `context`, same order.
    pub sources: Vec<SourceAttribution>,

    /// Lower-ranked documents left out to respect the budget.
    pub dropped: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.context.chars().count()
    }
}

/// Builds bounded contexts from retrieval results.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    /// Concatenate hits in rank order while they fit.
    ///
    /// Documents are never cut except the top-ranked one when it alone
    /// exceeds the budget; that one is truncated and flagged. Once a
    /// document does not fit, it and every lower-ranked document are left
    /// out.
    pub fn assemble(&self, result: &RetrievalResult) -> AssembledContext {
        let budget = self.config.max_chars;
        let mut assembled = AssembledContext::default();
        let mut used = 0usize;

        for (position, hit) in result.hits.iter().enumerate() {
            let document = &hit.document;
            let header = format!(
                "[Source {}] {} {}",
                position + 1,
                document.doc_type,
                document.source_id
            );
            let block = format!("{header}\n{}", document.text);
            let block_len = block.chars().count();

            let mut metadata = document.metadata.clone();
            metadata.insert("document_id".to_string(), document.id.clone().into());

            if position == 0 {
                if block_len > budget {
                    warn!(
                        "Top document {} is {block_len} characters; truncating to {budget}",
                        document.id
                    );
                    assembled.context = block.chars().take(budget).collect();
                    metadata.insert("truncated".to_string(), true.into());
                    used = budget;
                } else {
                    assembled.context = block;
                    used = block_len;
                }
            } else {
                let needed = BLOCK_SEPARATOR.len() + block_len;
                if used + needed > budget {
                    assembled.dropped = result.hits.len() - position;
                    break;
                }
                assembled.context.push_str(BLOCK_SEPARATOR);
                assembled.context.push_str(&block);
                used += needed;
            }

            assembled.sources.push(SourceAttribution {
                doc_type: document.doc_type,
                source_id: document.source_id.clone(),
                relevance_score: hit.score,
                metadata,
            });
        }

        debug!(
            "Assembled context: {} sources, {used} of {budget} characters, {} dropped",
            assembled.sources.len(),
            assembled.dropped
        );
        assembled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_documents::Document;
    use courtside_embeddings::ScoredDocument;
    use pretty_assertions::assert_eq;

    fn hit(id: &str, kind: RecordKind, text: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            document: Document::new(id, kind, id, text),
            score,
        }
    }

    fn result(hits: Vec<ScoredDocument>) -> RetrievalResult {
        RetrievalResult {
            query: "q".to_string(),
            hits,
            below_cutoff: 0,
        }
    }

    #[test]
    fn test_blocks_and_sources_line_up() {
        let assembler = ContextAssembler::new(ContextConfig::new(1000));
        let out = assembler.assemble(&result(vec![
            hit("LAL", RecordKind::Team, "Lakers won 52 games in 2020", 0.9),
            hit("jamesle01", RecordKind::Player, "Player: LeBron James", 0.5),
        ]));

        assert_eq!(
            out.context,
            "[Source 1] team LAL\nLakers won 52 games in 2020\n\n\
             [Source 2] player jamesle01\nPlayer: LeBron James"
        );
        assert_eq!(out.sources.len(), 2);
        assert_eq!(out.sources[1].doc_type, RecordKind::Player);
        assert_eq!(out.sources[1].source_id, "jamesle01");
        assert_eq!(out.sources[0].metadata["document_id"], serde_json::json!("LAL"));
        assert!(!out.sources[0].is_truncated());
        assert_eq!(out.dropped, 0);
    }

    #[test]
    fn test_budget_drops_from_lowest_rank_without_partial_blocks() {
        let text = "x".repeat(100);
        let hits = vec![
            hit("a", RecordKind::Game, &text, 0.9),
            hit("b", RecordKind::Game, &text, 0.8),
            hit("c", RecordKind::Game, &text, 0.7),
            hit("d", RecordKind::Game, "tiny", 0.6),
        ];
        // Two blocks of 118 characters plus a separator fit; the third does not.
        let assembler = ContextAssembler::new(ContextConfig::new(300));
        let out = assembler.assemble(&result(hits));

        assert_eq!(out.sources.len(), 2);
        assert_eq!(out.dropped, 2);
        assert!(out.char_len() <= 300);
        assert!(out.context.ends_with(&text));
        assert!(!out.context.contains("[Source 3]"));
    }

    #[test]
    fn test_oversized_top_document_is_truncated_and_flagged() {
        let assembler = ContextAssembler::new(ContextConfig::new(50));
        let out = assembler.assemble(&result(vec![
            hit("a", RecordKind::Coach, &"y".repeat(500), 0.9),
            hit("b", RecordKind::Coach, "short", 0.8),
        ]));

        assert_eq!(out.char_len(), 50);
        assert_eq!(out.sources.len(), 1);
        assert!(out.sources[0].is_truncated());
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn test_attribution_json_shape() {
        let attribution = SourceAttribution {
            doc_type: RecordKind::Team,
            source_id: "LAL".to_string(),
            relevance_score: 0.5,
            metadata: Metadata::new(),
        };
        let json = serde_json::to_value(&attribution).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "team",
                "id": "LAL",
                "relevance_score": 0.5,
                "metadata": {}
            })
        );
    }

    #[test]
    fn test_empty_result() {
        let out = ContextAssembler::default().assemble(&result(Vec::new()));
        assert!(out.is_empty());
        assert_eq!(out.context, "");
    }
}
