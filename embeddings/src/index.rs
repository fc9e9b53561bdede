//! Vector index over documents, with durable persistence.
//!
//! Vectors are L2-normalized when added so that `search` is a plain
//! inner-product scan. The scan is brute force, which is adequate for tens of
//! thousands of documents; an approximate structure can replace it behind the
//! same `add`/`search` contract.

use std::collections::HashMap;
use std::path::Path;

use courtside_documents::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::ProviderTag;
use crate::similarity::{dot_product, normalize, top_k};

/// Version of the on-disk layout.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// An entry in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The indexed document.
    pub document: Document,

    /// Hash of the document at embedding time.
    pub content_hash: String,

    /// The embedding vector (normalized).
    pub embedding: Embedding,
}

/// A document paired with its relevance to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,

    /// Cosine similarity to the query.
    pub score: f32,
}

/// Storage format for the vector index.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    provider: ProviderTag,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Borrowed view of [`IndexFile`] for writing without cloning entries.
#[derive(Debug, Serialize)]
struct IndexFileRef<'a> {
    format_version: u32,
    provider: &'a ProviderTag,
    dimension: usize,
    entries: &'a [IndexEntry],
}

/// Documents and their vectors, stamped with the provider that made them.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// Provider identity; fixes the dimension.
    tag: ProviderTag,

    /// Entries in insertion order.
    entries: Vec<IndexEntry>,

    /// Document id to position in `entries`.
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    /// Create an empty index for vectors produced by `tag`.
    pub fn new(tag: ProviderTag) -> Self {
        Self {
            tag,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Provider identity of this index.
    pub fn tag(&self) -> &ProviderTag {
        &self.tag
    }

    /// Vector dimension of this index.
    pub fn dimension(&self) -> usize {
        self.tag.dimension
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a document and its vector.
    ///
    /// Fails on a dimension mismatch, a non-finite component, or a document id
    /// that is already indexed.
    pub fn add(&mut self, document: Document, mut embedding: Embedding) -> Result<()> {
        if embedding.len() != self.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::InvalidResponse(format!(
                "non-finite vector component for document {}",
                document.id
            )));
        }
        if self.positions.contains_key(&document.id) {
            return Err(EmbeddingError::DuplicateDocument(document.id));
        }

        normalize(&mut embedding);

        let id = document.id.clone();
        let content_hash = document.content_hash();
        self.positions.insert(id.clone(), self.entries.len());
        self.entries.push(IndexEntry {
            document,
            content_hash,
            embedding,
        });
        debug!("Added document to index: {id}");

        Ok(())
    }

    /// Return the `k` documents most similar to `query`.
    ///
    /// Results are ordered by non-increasing cosine similarity, ties broken
    /// by insertion order. Fewer than `k` documents yields all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 {
            return Err(EmbeddingError::InvalidK(k));
        }
        if query.len() != self.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scores = Vec::with_capacity(self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            scores.push((position, dot_product(&query, &entry.embedding)?));
        }

        Ok(top_k(scores, k)
            .into_iter()
            .map(|(position, score)| ScoredDocument {
                document: self.entries[position].document.clone(),
                score,
            })
            .collect())
    }

    /// Get an entry by document id.
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    /// Check if a document id exists in the index.
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// The stored vector for `id`, if its content hash still matches.
    ///
    /// Lets a rebuild skip re-embedding unchanged documents.
    pub fn vector_for(&self, id: &str, content_hash: &str) -> Option<&[f32]> {
        self.get(id)
            .filter(|entry| entry.content_hash == content_hash)
            .map(|entry| entry.embedding.as_slice())
    }

    /// Iterate over entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Iterate over indexed documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().map(|e| &e.document)
    }

    /// Serialize the index to JSON.
    pub fn to_json(&self) -> Result<String> {
        let file = IndexFileRef {
            format_version: INDEX_FORMAT_VERSION,
            provider: &self.tag,
            dimension: self.dimension(),
            entries: &self.entries,
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Load an index from JSON, refusing anything not built by `expected`.
    pub fn from_json(json: &str, expected: &ProviderTag) -> Result<Self> {
        let file: IndexFile = serde_json::from_str(json)?;

        if file.format_version != INDEX_FORMAT_VERSION {
            return Err(EmbeddingError::UnsupportedFormat {
                found: file.format_version,
                supported: INDEX_FORMAT_VERSION,
            });
        }
        if &file.provider != expected || file.dimension != expected.dimension {
            return Err(EmbeddingError::IndexMismatch {
                expected: expected.clone(),
                found: ProviderTag {
                    dimension: file.dimension,
                    ..file.provider
                },
            });
        }

        let mut index = Self::new(file.provider);
        for entry in file.entries {
            if entry.embedding.len() != index.dimension() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: index.dimension(),
                    actual: entry.embedding.len(),
                });
            }
            if index.positions.contains_key(&entry.document.id) {
                return Err(EmbeddingError::DuplicateDocument(entry.document.id));
            }
            // Stored vectors are already normalized; keep them bit-for-bit.
            index
                .positions
                .insert(entry.document.id.clone(), index.entries.len());
            index.entries.push(entry);
        }

        info!("Loaded {} entries into vector index", index.len());
        Ok(index)
    }

    /// Persist the index to `path`.
    ///
    /// Writes a sibling temporary file and renames it into place, so a crash
    /// never leaves a half-written index behind.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;

        info!(
            "Saved vector index ({} entries, {}) to {}",
            self.len(),
            self.tag,
            path.display()
        );
        Ok(())
    }

    /// Load an index from `path`, refusing incompatible indexes.
    pub async fn load(path: impl AsRef<Path>, expected: &ProviderTag) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let index = Self::from_json(&json, expected)?;
        info!("Loaded vector index from {}", path.display());
        Ok(index)
    }

    /// Read only the provider tag of a persisted index.
    pub async fn peek_tag(path: impl AsRef<Path>) -> Result<ProviderTag> {
        #[derive(Deserialize)]
        struct Header {
            provider: ProviderTag,
        }
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let header: Header = serde_json::from_str(&json)?;
        Ok(header.provider)
    }
}
