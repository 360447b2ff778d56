//! Error types for the `ragpipe-core` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's length disagrees with the dimension the store was created with.
    ///
    /// This always indicates a misconfiguration between the embedding model and
    /// the store; vectors are never truncated or padded to fit.
    #[error("Embedding dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the store was created with.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query was empty or whitespace only.
    #[error("query must not be empty")]
    EmptyQuery,

    /// A chunk failed to embed or store while ingesting a document.
    #[error("ingestion of '{document_id}' failed at chunk {chunk_index} ({stored} stored): {source}")]
    Ingestion {
        /// The document being ingested.
        document_id: String,
        /// Index of the chunk that failed.
        chunk_index: usize,
        /// Number of chunks stored before the failure.
        stored: usize,
        /// The underlying failure.
        #[source]
        source: Box<RagError>,
    },

    /// A document source could not be read.
    #[error("Document source error: {0}")]
    Source(String),

    /// An I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
