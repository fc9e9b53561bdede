//! Retrievable text units derived from records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::record::RecordKind;

/// Auxiliary key/value pairs carried alongside a document.
///
/// Ordered so that serialization and hashing are deterministic.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A flat, self-contained text serialization of (part of) one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique, deterministic identifier (e.g. `team:LAL:season:2020`).
    pub id: String,

    /// Human-readable text handed to the embedding and generation steps.
    pub text: String,

    /// Kind of the originating record.
    pub doc_type: RecordKind,

    /// Identifier of the originating record.
    pub source_id: String,

    /// Fields lifted from the record for attribution and filtering.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(
        id: impl Into<String>,
        doc_type: RecordKind,
        source_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            doc_type,
            source_id: source_id.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a metadata entry only when a value is present.
    pub fn with_opt_meta<V: Into<serde_json::Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_meta(key, value),
            None => self,
        }
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// SHA-256 over everything that influences the embedding or attribution.
    ///
    /// Two documents with the same hash can share a vector.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.doc_type.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.source_id.as_bytes());
        hasher.update([0]);
        hasher.update(self.text.as_bytes());
        hasher.update([0]);
        // BTreeMap keeps key order stable.
        if let Ok(meta) = serde_json::to_vec(&self.metadata) {
            hasher.update(meta);
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_content_hash_is_stable_and_sensitive() {
        let a = Document::new("team:LAL:profile", RecordKind::Team, "LAL", "Team: Lakers")
            .with_meta("team_name", "Los Angeles Lakers");
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        let c = a.clone().with_meta("founded_year", 1947);
        assert_ne!(a.content_hash(), c.content_hash());

        let mut d = a.clone();
        d.text.push('.');
        assert_ne!(a.content_hash(), d.content_hash());
    }

    #[test]
    fn test_with_opt_meta_skips_none() {
        let doc = Document::new("x", RecordKind::Game, "x", "text")
            .with_opt_meta::<i32>("season", None)
            .with_opt_meta("league", Some("NBA"));
        assert!(!doc.metadata.contains_key("season"));
        assert_eq!(doc.metadata["league"], serde_json::json!("NBA"));
    }
}
