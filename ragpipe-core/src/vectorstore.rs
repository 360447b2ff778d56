//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, Embedding, RetrievalMatch, StoredEntry};
use crate::error::{RagError, Result};

/// A storage backend for chunk embeddings with nearest-neighbour search.
///
/// A store is created for one embedding dimension. Vectors of any other length
/// are rejected with [`RagError::DimensionMismatch`]. Entries are only ever
/// appended: adding the same chunk twice stores it twice.
///
/// Implementations must be safe to share between tasks; concurrent searches
/// may or may not observe entries added by an in-flight ingestion.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(768);
/// store.add(embedding, chunk).await?;
/// let matches = store.search(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The embedding dimension agreed at creation time.
    fn dimensions(&self) -> usize;

    /// Persist one embedding with its chunk.
    async fn add(&self, embedding: Embedding, chunk: Chunk) -> Result<()>;

    /// Persist several entries.
    ///
    /// The default implementation calls [`add`](VectorStore::add) for each
    /// entry in order, stopping at the first failure.
    async fn add_all(&self, entries: Vec<StoredEntry>) -> Result<()> {
        for entry in entries {
            self.add(entry.embedding, entry.chunk).await?;
        }
        Ok(())
    }

    /// Return at most `top_k` matches ordered by descending similarity.
    ///
    /// Ties are returned in insertion order. An empty store yields an empty `Vec`.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalMatch>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;
}

/// Fail with [`RagError::DimensionMismatch`] unless `actual == expected`.
pub fn check_dimensions(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RagError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
