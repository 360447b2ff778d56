//! The text → vector seam used by both ingestion and answering.

use async_trait::async_trait;

use crate::document::Embedding;
use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// The same provider must embed stored chunks and queries, otherwise scores
/// are meaningless. Every vector it returns has [`dimensions`](Self::dimensions)
/// elements; the pipeline and answerer check this against the vector store.
///
/// Backend failures are reported as [`RagError::Embedding`](crate::RagError::Embedding).
///
/// ```rust,ignore
/// use ragpipe_core::EmbeddingProvider;
///
/// let embedding = provider.embed("Paris is the capital of France.").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts, returning vectors in input order.
    ///
    /// Defaults to one [`embed`](Self::embed) call per text, stopping at the
    /// first failure.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    /// Embeds a text as `[chars, words]` and refuses the word "boom".
    struct Counting;

    #[async_trait]
    impl EmbeddingProvider for Counting {
        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, text: &str) -> Result<Embedding> {
            if text.contains("boom") {
                return Err(RagError::Embedding { provider: "counting".into(), message: "boom".into() });
            }
            Ok(vec![text.chars().count() as f32, text.split_whitespace().count() as f32])
        }
    }

    #[tokio::test]
    async fn default_batch_keeps_input_order() {
        let vectors = Counting.embed_batch(&["a b c", "de"]).await.unwrap();
        assert_eq!(vectors, vec![vec![5.0, 3.0], vec![2.0, 1.0]]);
        assert!(Counting.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_batch_stops_at_first_failure() {
        let err = Counting.embed_batch(&["fine", "boom", "never"]).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding { .. }));
    }
}
