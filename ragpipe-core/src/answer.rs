//! Retrieval-augmented answering: embed → search → assemble → generate.
//!
//! [`Answerer::answer`] is the end-user path. It never fails: any error is
//! turned into a string starting with [`ERROR_MARKER`]. Callers that want a
//! structured error use [`Answerer::try_answer`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::document::RetrievalMatch;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::Generator;
use crate::vectorstore::{VectorStore, check_dimensions};

/// Prefix of every answer produced for a failed query.
pub const ERROR_MARKER: &str = "Error processing query:";

/// Number of matches retrieved when the builder is not given a value.
pub const DEFAULT_TOP_K: usize = 3;

/// A generated answer together with the matches it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The generator's output, verbatim.
    pub text: String,
    /// The retrieved matches, in search order.
    pub matches: Vec<RetrievalMatch>,
}

/// Join the matched chunk texts in search order, separated by a blank line.
pub fn build_context(matches: &[RetrievalMatch]) -> String {
    matches.iter().map(|m| m.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Render the generation prompt for `query` and its assembled `context`.
///
/// An empty context still produces the full template.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!("Based on the following context, answer the question: {query}\n\nContext:\n{context}")
}

/// Answers natural-language queries from the vector store.
///
/// Construct one via [`Answerer::builder()`].
pub struct Answerer {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl Answerer {
    /// Create a new [`AnswererBuilder`].
    pub fn builder() -> AnswererBuilder {
        AnswererBuilder::default()
    }

    /// Number of matches retrieved per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return the `top_k` closest matches.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuery`] for a blank query without calling any
    /// backend, otherwise any embedding or vector store error.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalMatch>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let query_embedding = self.embedding_provider.embed(query).await?;
        check_dimensions(self.vector_store.dimensions(), query_embedding.len())?;

        let matches = self.vector_store.search(&query_embedding, self.top_k).await?;
        debug!(top_k = self.top_k, matched = matches.len(), "retrieved context");
        Ok(matches)
    }

    /// Answer `query`, propagating any failure.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuery`] for a blank query, otherwise the first
    /// embedding, search or generation error.
    pub async fn try_answer(&self, query: &str) -> Result<Answer> {
        let matches = self.retrieve(query).await?;
        let context = build_context(&matches);
        let prompt = build_prompt(query, &context);

        let text = self.generator.generate(&prompt).await?;
        info!(matched = matches.len(), answer_len = text.len(), "answered query");
        Ok(Answer { text, matches })
    }

    /// Answer `query`, converting any failure into a user-facing message.
    ///
    /// The returned string is the generator's output, or
    /// `"Error processing query: <cause>"` if any step failed.
    pub async fn answer(&self, query: &str) -> String {
        match self.try_answer(query).await {
            Ok(answer) => answer.text,
            Err(e) => {
                error!(error = %e, "query failed");
                format!("{ERROR_MARKER} {e}")
            }
        }
    }
}

/// Builder for constructing an [`Answerer`].
#[derive(Default)]
pub struct AnswererBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
    top_k: Option<usize>,
}

impl AnswererBuilder {
    /// Set the embedding provider used for queries.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store to search.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generator that writes the answer.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the number of matches retrieved per query (default 3).
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Build the [`Answerer`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a component is missing or `top_k` is zero.
    pub fn build(self) -> Result<Answerer> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;
        let top_k = self.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        Ok(Answerer { embedding_provider, vector_store, generator, top_k })
    }
}
