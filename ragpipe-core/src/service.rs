//! The assembled RAG service.
//!
//! [`RagService`] owns one [`IngestionPipeline`] and one [`Answerer`] sharing
//! the same embedding provider and vector store. Front ends (CLI, HTTP
//! server) hold it behind an `Arc` and never see the backends directly.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::answer::{Answer, Answerer};
use crate::chunking::{Chunker, ChunkingStrategy, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::Generator;
use crate::inmemory::InMemoryVectorStore;
use crate::pipeline::{IngestReport, IngestSummary, IngestionPipeline};
use crate::settings::{Settings, StoreBackend};
use crate::source::DocumentSource;
use crate::vectorstore::{VectorStore, check_dimensions};

/// Outcome of probing one backend.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComponentStatus {
    /// Whether the probe succeeded.
    pub ok: bool,
    /// What the probe observed, or why it failed.
    pub detail: String,
}

impl ComponentStatus {
    fn ok(detail: impl Into<String>) -> Self {
        Self { ok: true, detail: detail.into() }
    }

    fn failed(err: &RagError) -> Self {
        Self { ok: false, detail: err.to_string() }
    }
}

/// Result of [`RagService::check`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    /// Embedding provider probe.
    pub embedding: ComponentStatus,
    /// Vector store probe.
    pub store: ComponentStatus,
    /// Generator probe.
    pub generation: ComponentStatus,
}

impl HealthReport {
    /// Whether every backend answered.
    pub fn is_healthy(&self) -> bool {
        self.embedding.ok && self.store.ok && self.generation.ok
    }
}

/// Ingestion and answering over one shared set of backends.
pub struct RagService {
    pipeline: IngestionPipeline,
    answerer: Answerer,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
}

impl RagService {
    /// Wire a service from explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `config` is invalid and
    /// [`RagError::DimensionMismatch`] if the provider and store disagree.
    pub fn new(
        config: RagConfig,
        chunker: Arc<dyn Chunker>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let top_k = config.top_k;
        let pipeline = IngestionPipeline::builder()
            .config(config)
            .chunker(chunker)
            .embedding_provider(embedding_provider.clone())
            .vector_store(vector_store.clone())
            .build()?;
        let answerer = Answerer::builder()
            .embedding_provider(embedding_provider.clone())
            .vector_store(vector_store.clone())
            .generator(generator.clone())
            .top_k(top_k)
            .build()?;
        Ok(Self { pipeline, answerer, embedding_provider, vector_store, generator })
    }

    /// Build the backends named in `settings` and wire them together.
    ///
    /// Connecting to Milvus creates the collection if needed, so this is async.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the settings are invalid or name a
    /// backend this build does not include, and [`RagError::VectorStore`] if
    /// the store cannot be reached.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let chunker = build_chunker(settings)?;
        let (embedding_provider, generator) = ollama_backends(settings)?;
        let vector_store = build_store(settings).await?;
        info!(
            store = ?settings.store.backend,
            chunking = ?settings.chunking,
            dimensions = settings.dimensions,
            "rag service ready"
        );
        Self::new(settings.rag.clone(), chunker, embedding_provider, vector_store, generator)
    }

    /// The ingestion half.
    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    /// The answering half.
    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    /// The shared vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest one document. See [`IngestionPipeline::ingest`].
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        self.pipeline.ingest(document).await
    }

    /// Ingest every document of `source`. See [`IngestionPipeline::ingest_all`].
    pub async fn ingest_all(&self, source: &dyn DocumentSource) -> Result<IngestSummary> {
        self.pipeline.ingest_all(source).await
    }

    /// Answer `query`. Never fails; see [`Answerer::answer`].
    pub async fn answer(&self, query: &str) -> String {
        self.answerer.answer(query).await
    }

    /// Answer `query` with the matches used. See [`Answerer::try_answer`].
    pub async fn try_answer(&self, query: &str) -> Result<Answer> {
        self.answerer.try_answer(query).await
    }

    /// Remove every stored chunk.
    pub async fn reset(&self) -> Result<()> {
        self.vector_store.clear().await?;
        info!("vector store cleared");
        Ok(())
    }

    /// Probe each backend once.
    ///
    /// Embeds `"test"` and compares the vector length with the store, counts
    /// the stored entries, and sends `"Hello"` to the generator. Probes are
    /// independent: one failing does not skip the others.
    pub async fn check(&self) -> HealthReport {
        let expected = self.vector_store.dimensions();
        let embedding = match self.embedding_provider.embed("test").await {
            Ok(vector) => match check_dimensions(expected, vector.len()) {
                Ok(()) => ComponentStatus::ok(format!("{} dimensions", vector.len())),
                Err(e) => ComponentStatus::failed(&e),
            },
            Err(e) => ComponentStatus::failed(&e),
        };

        let store = match self.vector_store.len().await {
            Ok(count) => ComponentStatus::ok(format!("{count} entries")),
            Err(e) => ComponentStatus::failed(&e),
        };

        let generation = match self.generator.generate("Hello").await {
            Ok(reply) => ComponentStatus::ok(format!("{} characters", reply.chars().count())),
            Err(e) => ComponentStatus::failed(&e),
        };

        let report = HealthReport { embedding, store, generation };
        if !report.is_healthy() {
            warn!(?report, "backend check failed");
        }
        report
    }
}

fn build_chunker(settings: &Settings) -> Result<Arc<dyn Chunker>> {
    match settings.chunking {
        ChunkingStrategy::Fixed if settings.boundary_lookback > 0 => Ok(Arc::new(
            FixedSizeChunker::new(settings.rag.chunk_size, settings.rag.chunk_overlap)?
                .with_boundary_lookback(settings.boundary_lookback),
        )),
        strategy => strategy.build(&settings.rag),
    }
}

#[cfg(feature = "ollama")]
fn ollama_backends(
    settings: &Settings,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn Generator>)> {
    use std::time::Duration;

    use crate::ollama::{OllamaEmbeddingProvider, OllamaGenerator};

    let ollama = &settings.ollama;
    let timeout = Duration::from_secs(ollama.timeout_secs);
    let embedder = OllamaEmbeddingProvider::with_timeout(ollama.base_url.clone(), timeout)?
        .with_model(ollama.embedding_model.clone())
        .with_dimensions(settings.dimensions);
    let generator = OllamaGenerator::with_timeout(ollama.base_url.clone(), timeout)?
        .with_model(ollama.chat_model.clone());
    Ok((Arc::new(embedder), Arc::new(generator)))
}

#[cfg(not(feature = "ollama"))]
fn ollama_backends(
    _settings: &Settings,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn Generator>)> {
    Err(RagError::Config("built without the `ollama` feature".to_string()))
}

async fn build_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new(settings.dimensions))),
        StoreBackend::Milvus => milvus_store(settings).await,
    }
}

#[cfg(feature = "milvus")]
async fn milvus_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    use crate::milvus::{MilvusConfig, MilvusVectorStore};

    let config = MilvusConfig {
        uri: settings.store.milvus_uri.clone(),
        token: settings.store.milvus_token.clone(),
        collection: settings.store.collection.clone(),
        dimensions: settings.dimensions,
        ..MilvusConfig::default()
    };
    Ok(Arc::new(MilvusVectorStore::connect(config).await?))
}

#[cfg(not(feature = "milvus"))]
async fn milvus_store(_settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    Err(RagError::Config("built without the `milvus` feature".to_string()))
}
