//! Process-wide settings.
//!
//! [`Settings`] is built once at start-up and handed to
//! [`RagService::from_settings`](crate::RagService::from_settings). Values come
//! from `RAGPIPE_*` environment variables layered over the defaults below;
//! front ends may override individual fields afterwards.
//!
//! | variable | default |
//! |---|---|
//! | `RAGPIPE_OLLAMA_URL` | `http://localhost:11434` |
//! | `RAGPIPE_EMBEDDING_MODEL` | `nomic-embed-text` |
//! | `RAGPIPE_CHAT_MODEL` | `llama3.2` |
//! | `RAGPIPE_DIMENSIONS` | `768` |
//! | `RAGPIPE_TIMEOUT_SECS` | `180` |
//! | `RAGPIPE_STORE` | `memory` (`memory` or `milvus`) |
//! | `RAGPIPE_MILVUS_URI` | `http://localhost:19530` |
//! | `RAGPIPE_MILVUS_TOKEN` | unset |
//! | `RAGPIPE_COLLECTION` | `rag_collection` |
//! | `RAGPIPE_CHUNKING` | `fixed` (`fixed` or `recursive`) |
//! | `RAGPIPE_BOUNDARY_LOOKBACK` | `0` |
//! | `RAGPIPE_CHUNK_SIZE` | `500` |
//! | `RAGPIPE_CHUNK_OVERLAP` | `100` |
//! | `RAGPIPE_TOP_K` | `3` |
//! | `RAGPIPE_CONCURRENCY` | `1` |
//! | `RAGPIPE_INGEST_POLICY` | `fail_fast` (`fail_fast` or `best_effort`) |
//! | `RAGPIPE_DOCUMENTS_DIR` | `documents` |
//! | `RAGPIPE_HOST` | `127.0.0.1` |
//! | `RAGPIPE_PORT` | `8080` |

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkingStrategy;
use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Which [`VectorStore`](crate::VectorStore) implementation to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// [`InMemoryVectorStore`](crate::InMemoryVectorStore); contents are lost on exit.
    #[default]
    Memory,
    /// Milvus over its REST API (requires the `milvus` feature).
    Milvus,
}

impl FromStr for StoreBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            "milvus" => Ok(Self::Milvus),
            other => Err(RagError::Config(format!("unknown store backend '{other}'"))),
        }
    }
}

/// Ollama connection and model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaSettings {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Model used for answers.
    pub chat_model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.2".to_string(),
            timeout_secs: 180,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Which backend to use.
    pub backend: StoreBackend,
    /// Milvus base URI.
    pub milvus_uri: String,
    /// Optional Milvus bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milvus_token: Option<String>,
    /// Collection name.
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            milvus_uri: "http://localhost:19530".to_string(),
            milvus_token: None,
            collection: "rag_collection".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

/// Everything needed to assemble a [`RagService`](crate::RagService).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Chunking, retrieval and ingestion parameters.
    pub rag: RagConfig,
    /// Which chunker to build.
    pub chunking: ChunkingStrategy,
    /// Whitespace lookback for the fixed chunker (0 = hard cut).
    pub boundary_lookback: usize,
    /// Embedding dimension shared by the embedding model and the store.
    pub dimensions: usize,
    /// Ollama backend settings.
    pub ollama: OllamaSettings,
    /// Vector store settings.
    pub store: StoreSettings,
    /// Directory of `*.txt` documents to ingest.
    pub documents_dir: PathBuf,
    /// HTTP server settings.
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rag: RagConfig::default(),
            chunking: ChunkingStrategy::Fixed,
            boundary_lookback: 0,
            dimensions: 768,
            ollama: OllamaSettings::default(),
            store: StoreSettings::default(),
            documents_dir: PathBuf::from("documents"),
            server: ServerSettings::default(),
        }
    }
}

fn parsed<T: FromStr>(key: &str, raw: String) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| RagError::Config(format!("invalid value '{raw}' for {key}: {e}")))
}

impl Settings {
    /// Read settings from the process environment over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a variable cannot be parsed or the
    /// result fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (a variable name → value function) over the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("RAGPIPE_OLLAMA_URL") {
            settings.ollama.base_url = v;
        }
        if let Some(v) = var("RAGPIPE_EMBEDDING_MODEL") {
            settings.ollama.embedding_model = v;
        }
        if let Some(v) = var("RAGPIPE_CHAT_MODEL") {
            settings.ollama.chat_model = v;
        }
        if let Some(v) = var("RAGPIPE_TIMEOUT_SECS") {
            settings.ollama.timeout_secs = parsed("RAGPIPE_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = var("RAGPIPE_DIMENSIONS") {
            settings.dimensions = parsed("RAGPIPE_DIMENSIONS", v)?;
        }
        if let Some(v) = var("RAGPIPE_STORE") {
            settings.store.backend = parsed("RAGPIPE_STORE", v)?;
        }
        if let Some(v) = var("RAGPIPE_MILVUS_URI") {
            settings.store.milvus_uri = v;
        }
        if let Some(v) = var("RAGPIPE_MILVUS_TOKEN") {
            settings.store.milvus_token = Some(v);
        }
        if let Some(v) = var("RAGPIPE_COLLECTION") {
            settings.store.collection = v;
        }
        if let Some(v) = var("RAGPIPE_CHUNKING") {
            settings.chunking = parsed("RAGPIPE_CHUNKING", v)?;
        }
        if let Some(v) = var("RAGPIPE_BOUNDARY_LOOKBACK") {
            settings.boundary_lookback = parsed("RAGPIPE_BOUNDARY_LOOKBACK", v)?;
        }
        if let Some(v) = var("RAGPIPE_CHUNK_SIZE") {
            settings.rag.chunk_size = parsed("RAGPIPE_CHUNK_SIZE", v)?;
        }
        if let Some(v) = var("RAGPIPE_CHUNK_OVERLAP") {
            settings.rag.chunk_overlap = parsed("RAGPIPE_CHUNK_OVERLAP", v)?;
        }
        if let Some(v) = var("RAGPIPE_TOP_K") {
            settings.rag.top_k = parsed("RAGPIPE_TOP_K", v)?;
        }
        if let Some(v) = var("RAGPIPE_CONCURRENCY") {
            settings.rag.concurrency = parsed("RAGPIPE_CONCURRENCY", v)?;
        }
        if let Some(v) = var("RAGPIPE_INGEST_POLICY") {
            settings.rag.ingest_policy = parsed("RAGPIPE_INGEST_POLICY", v)?;
        }
        if let Some(v) = var("RAGPIPE_DOCUMENTS_DIR") {
            settings.documents_dir = PathBuf::from(v);
        }
        if let Some(v) = var("RAGPIPE_HOST") {
            settings.server.host = v;
        }
        if let Some(v) = var("RAGPIPE_PORT") {
            settings.server.port = parsed("RAGPIPE_PORT", v)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the RAG parameters are invalid or the
    /// embedding dimension is zero.
    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;
        if self.dimensions == 0 {
            return Err(RagError::Config("dimensions must be greater than zero".to_string()));
        }
        Ok(())
    }
}
