//! Document ingestion: chunk → embed → store.
//!
//! The [`IngestionPipeline`] composes a [`Chunker`], an [`EmbeddingProvider`]
//! and a [`VectorStore`]. Each chunk is embedded and stored individually so a
//! failure can be attributed to a chunk index.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragpipe_core::{IngestionPipeline, RagConfig, InMemoryVectorStore, FixedSizeChunker};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(768)))
//!     .chunker(Arc::new(FixedSizeChunker::new(500, 100)?))
//!     .build()?;
//!
//! let report = pipeline.ingest(&document).await?;
//! println!("stored {} chunks", report.chunks_stored);
//! ```
//!
//! Ingestion never deduplicates: running the same document through twice
//! stores every chunk twice. Clear the store first to rebuild an index.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::config::{IngestPolicy, RagConfig};
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::source::DocumentSource;
use crate::vectorstore::{VectorStore, check_dimensions};

/// A chunk that could not be embedded or stored under [`IngestPolicy::BestEffort`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChunkFailure {
    /// Index of the failed chunk within its document.
    pub index: usize,
    /// Description of the failure.
    pub message: String,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestReport {
    /// The ingested document.
    pub document_id: String,
    /// Number of chunks the document was split into.
    pub chunks_total: usize,
    /// Number of chunks embedded and stored.
    pub chunks_stored: usize,
    /// Chunks skipped under [`IngestPolicy::BestEffort`].
    pub failures: Vec<ChunkFailure>,
}

impl IngestReport {
    fn empty(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            chunks_total: 0,
            chunks_stored: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every chunk was stored.
    pub fn is_complete(&self) -> bool {
        self.chunks_stored == self.chunks_total
    }
}

/// Outcome of ingesting every document of a [`DocumentSource`].
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    /// Reports for documents that were ingested.
    pub reports: Vec<IngestReport>,
    /// Documents that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl IngestSummary {
    /// Total chunks stored across all documents.
    pub fn chunks_stored(&self) -> usize {
        self.reports.iter().map(|r| r.chunks_stored).sum()
    }
}

/// The ingestion orchestrator.
///
/// Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest a single document.
    ///
    /// Chunks are produced sequentially, then embedded and stored one by one,
    /// or up to `config.concurrency` at a time.
    ///
    /// # Errors
    ///
    /// Under [`IngestPolicy::FailFast`], returns [`RagError::Ingestion`] for
    /// the first chunk that fails, carrying the number of chunks already
    /// stored. Under [`IngestPolicy::BestEffort`] failures are collected in
    /// [`IngestReport::failures`] and this method does not fail.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(document);
        let mut report = IngestReport::empty(&document.id);
        report.chunks_total = chunks.len();
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(report);
        }

        let workers = self.config.concurrency.max(1);
        let mut outcomes = stream::iter(chunks)
            .map(|chunk| self.store_chunk(chunk))
            .buffer_unordered(workers);

        while let Some((index, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => report.chunks_stored += 1,
                Err(e) => match self.config.ingest_policy {
                    IngestPolicy::FailFast => {
                        error!(
                            document.id = %document.id,
                            chunk_index = index,
                            stored = report.chunks_stored,
                            error = %e,
                            "ingestion aborted"
                        );
                        return Err(RagError::Ingestion {
                            document_id: document.id.clone(),
                            chunk_index: index,
                            stored: report.chunks_stored,
                            source: Box::new(e),
                        });
                    }
                    IngestPolicy::BestEffort => {
                        warn!(document.id = %document.id, chunk_index = index, error = %e, "skipping chunk");
                        report.failures.push(ChunkFailure { index, message: e.to_string() });
                    }
                },
            }
        }

        report.failures.sort_by_key(|f| f.index);
        info!(
            document.id = %document.id,
            chunk_count = report.chunks_total,
            stored = report.chunks_stored,
            failed = report.failures.len(),
            "ingested document"
        );
        Ok(report)
    }

    async fn store_chunk(&self, chunk: Chunk) -> (usize, Result<()>) {
        let index = chunk.index;
        let embedded = self.embedding_provider.embed(&chunk.text).await;
        let outcome = match embedded {
            Ok(embedding) => self.vector_store.add(embedding, chunk).await,
            Err(e) => Err(e),
        };
        (index, outcome)
    }

    /// Load `id` from `source` and ingest it.
    ///
    /// A document the source does not have is logged and reported with zero
    /// chunks stored; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to read the document or if
    /// [`ingest`](Self::ingest) fails.
    pub async fn ingest_from(&self, source: &dyn DocumentSource, id: &str) -> Result<IngestReport> {
        match source.load(id).await? {
            Some(document) => self.ingest(&document).await,
            None => {
                warn!(document.id = id, "document not found, nothing ingested");
                Ok(IngestReport::empty(id))
            }
        }
    }

    /// Ingest every document `source` lists.
    ///
    /// A failing document is logged and recorded in [`IngestSummary::failed`];
    /// the remaining documents are still ingested.
    ///
    /// # Errors
    ///
    /// Returns an error only if the source cannot be listed.
    pub async fn ingest_all(&self, source: &dyn DocumentSource) -> Result<IngestSummary> {
        let ids = source.list().await?;
        if ids.is_empty() {
            warn!("document source is empty, nothing ingested");
        }

        let mut summary = IngestSummary::default();
        for id in ids {
            match self.ingest_from(source, &id).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(document.id = %id, error = %e, "failed to ingest document");
                    summary.failed.push((id, e.to_string()));
                }
            }
        }
        Ok(summary)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// All fields except `config` are required; `config` defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestionPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// configuration is invalid, and [`RagError::DimensionMismatch`] if the
    /// embedding provider and vector store disagree on the vector dimension.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::Config("chunker is required".to_string()))?;

        check_dimensions(vector_store.dimensions(), embedding_provider.dimensions())?;

        Ok(IngestionPipeline { config, embedding_provider, vector_store, chunker })
    }
}
