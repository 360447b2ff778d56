//! # ragpipe-core
//!
//! Retrieval-augmented generation over a local document collection.
//!
//! ## Overview
//!
//! Documents are split into overlapping chunks, each chunk is embedded and
//! stored in a vector store, and questions are answered by retrieving the
//! closest chunks and handing them to a generator as context.
//!
//! - [`Chunker`] - [`FixedSizeChunker`] and [`RecursiveChunker`]
//! - [`EmbeddingProvider`] - text to vector
//! - [`VectorStore`] - [`InMemoryVectorStore`], or Milvus with the `milvus` feature
//! - [`Generator`] - prompt to answer text
//! - [`DocumentSource`] - [`FileSystemSource`] reads `*.txt` files
//! - [`IngestionPipeline`] - chunk → embed → store
//! - [`Answerer`] - embed → search → assemble → generate
//! - [`RagService`] - both halves wired from [`Settings`]
//!
//! ## Quick Start
//!
//! ```rust
//! use ragpipe_core::{Chunker, Document, FixedSizeChunker};
//!
//! let chunker = FixedSizeChunker::new(10, 2).unwrap();
//! let chunks = chunker.chunk(&Document::new("alpha", "abcdefghijklmnop"));
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].text, "ijklmnop");
//! ```
//!
//! ## Features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `ollama` | [`ollama::OllamaEmbeddingProvider`] and [`ollama::OllamaGenerator`] |
//! | `milvus` | [`milvus::MilvusVectorStore`] |
//! | `full` | both |

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod inmemory;
pub mod pipeline;
pub mod service;
pub mod settings;
pub mod source;
pub mod vectorstore;

#[cfg(feature = "milvus")]
pub mod milvus;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use answer::{Answer, Answerer, AnswererBuilder, ERROR_MARKER, build_context, build_prompt};
pub use chunking::{Chunker, ChunkingStrategy, FixedSizeChunker, RecursiveChunker};
pub use config::{IngestPolicy, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, Embedding, RetrievalMatch, StoredEntry};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generator::Generator;
pub use inmemory::{InMemoryVectorStore, cosine_similarity};
pub use pipeline::{ChunkFailure, IngestReport, IngestSummary, IngestionPipeline};
pub use service::{ComponentStatus, HealthReport, RagService};
pub use settings::{OllamaSettings, ServerSettings, Settings, StoreBackend, StoreSettings};
pub use source::{DocumentSource, FileSystemSource};
pub use vectorstore::{VectorStore, check_dimensions};
