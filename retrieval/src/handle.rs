//! Shared, swappable handle to the current vector index.

use std::path::Path;
use std::sync::Arc;

use courtside_embeddings::{ProviderTag, VectorIndex};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::Result;

/// Handle to an immutable [`VectorIndex`] snapshot.
///
/// Readers take a snapshot and search it without holding any lock, so a
/// rebuild can be swapped in while earlier queries finish against the old
/// snapshot. Cloning the handle shares the same slot.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    current: Arc<RwLock<Arc<VectorIndex>>>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    /// A handle over an empty index for `tag`.
    pub fn empty(tag: ProviderTag) -> Self {
        Self::new(VectorIndex::new(tag))
    }

    /// Load a persisted index, refusing one built by a different provider.
    pub async fn load(path: impl AsRef<Path>, expected: &ProviderTag) -> Result<Self> {
        let index = VectorIndex::load(path, expected).await?;
        Ok(Self::new(index))
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<VectorIndex> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the current index, returning the previous snapshot.
    pub async fn swap(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let next = Arc::new(index);
        let (len, tag) = (next.len(), next.tag().clone());
        let previous = std::mem::replace(&mut *self.current.write().await, next);
        info!("Swapped in vector index with {len} documents ({tag})");
        previous
    }

    pub async fn tag(&self) -> ProviderTag {
        self.snapshot().await.tag().clone()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot().await.is_empty()
    }
}
