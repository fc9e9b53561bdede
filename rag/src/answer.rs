//! The structured answer returned to callers.

use chrono::{DateTime, Utc};
use courtside_retrieval::SourceAttribution;
use serde::{Deserialize, Serialize};

/// A generated analysis with the sources it was grounded on.
///
/// Serializes as `{query, analysis, sources, timestamp}` with an RFC 3339
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub query: String,

    /// Generated text.
    pub analysis: String,

    /// Sources in context order; `[Source n]` refers to `sources[n - 1]`.
    pub sources: Vec<SourceAttribution>,

    /// When generation completed.
    pub timestamp: DateTime<Utc>,
}

impl Answer {
    pub fn new(
        query: impl Into<String>,
        analysis: impl Into<String>,
        sources: Vec<SourceAttribution>,
    ) -> Self {
        Self {
            query: query.into(),
            analysis: analysis.into(),
            sources,
            timestamp: Utc::now(),
        }
    }

    /// Look up the attribution for a `[Source n]` citation.
    pub fn source(&self, n: usize) -> Option<&SourceAttribution> {
        n.checked_sub(1).and_then(|i| self.sources.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_documents::{Metadata, RecordKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_answer_json_shape() {
        let mut answer = Answer::new(
            "Lakers wins?",
            "52 [Source 1]",
            vec![SourceAttribution {
                doc_type: RecordKind::Team,
                source_id: "LAL".to_string(),
                relevance_score: 0.75,
                metadata: Metadata::new(),
            }],
        );
        answer.timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "Lakers wins?",
                "analysis": "52 [Source 1]",
                "sources": [{
                    "type": "team",
                    "id": "LAL",
                    "relevance_score": 0.75,
                    "metadata": {}
                }],
                "timestamp": "2024-05-01T12:00:00Z"
            })
        );

        assert_eq!(answer.source(1).unwrap().source_id, "LAL");
        assert!(answer.source(0).is_none());
        assert!(answer.source(2).is_none());
    }
}
