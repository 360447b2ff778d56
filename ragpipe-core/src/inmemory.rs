//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a brute-force vector store
//! backed by a `Vec` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small document sets.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, Embedding, RetrievalMatch, StoredEntry};
use crate::error::Result;
use crate::vectorstore::{VectorStore, check_dimensions};

/// An in-memory vector store using cosine similarity for search.
///
/// Entries are kept in insertion order, which is also the tie-break order
/// for equal scores.
///
/// # Example
///
/// ```rust
/// use ragpipe_core::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// assert_eq!(store.dimensions(), 384);
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store for vectors of `dimensions` elements.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, entries: RwLock::new(Vec::new()) }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn add(&self, embedding: Embedding, chunk: Chunk) -> Result<()> {
        check_dimensions(self.dimensions, embedding.len())?;
        self.entries.write().await.push(StoredEntry { embedding, chunk });
        Ok(())
    }

    async fn add_all(&self, entries: Vec<StoredEntry>) -> Result<()> {
        for entry in &entries {
            check_dimensions(self.dimensions, entry.embedding.len())?;
        }
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalMatch>> {
        check_dimensions(self.dimensions, embedding.len())?;
        let entries = self.entries.read().await;

        let mut scored: Vec<RetrievalMatch> = entries
            .iter()
            .map(|entry| RetrievalMatch {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        debug!(backend = "InMemory", stored = entries.len(), returned = scored.len(), "search");
        Ok(scored)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
