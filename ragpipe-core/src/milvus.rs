//! Milvus vector store backend.
//!
//! Provides [`MilvusVectorStore`], which implements [`VectorStore`] against
//! the Milvus RESTful API (v2) using `reqwest`. The collection is created on
//! connect with cosine similarity and auto-generated primary keys; chunk
//! fields are stored as dynamic fields next to the vector.
//!
//! This module is only available when the `milvus` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragpipe_core::milvus::{MilvusConfig, MilvusVectorStore};
//!
//! let store = MilvusVectorStore::connect(MilvusConfig::default()).await?;
//! store.add(embedding, chunk).await?;
//! let matches = store.search(&query_embedding, 3).await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, info};

use crate::document::{Chunk, Embedding, RetrievalMatch, StoredEntry};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, check_dimensions};

const BACKEND: &str = "milvus";
const VECTOR_FIELD: &str = "vector";
const OUTPUT_FIELDS: [&str; 6] =
    ["chunk_id", "text", "document_id", "chunk_index", "chunk_offset", "metadata"];

/// Connection settings for [`MilvusVectorStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MilvusConfig {
    /// Base URI of the Milvus server.
    pub uri: String,
    /// Optional bearer token (`user:password` or an API key).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Collection holding the chunks.
    pub collection: String,
    /// Embedding dimension of the collection.
    pub dimensions: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:19530".to_string(),
            token: None,
            collection: "rag_collection".to_string(),
            dimensions: 768,
            timeout_secs: 30,
        }
    }
}

/// Milvus response envelope: `code == 0` means success.
#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct HasCollection {
    has: bool,
}

/// A [`VectorStore`] backed by [Milvus](https://milvus.io/).
pub struct MilvusVectorStore {
    client: reqwest::Client,
    config: MilvusConfig,
}

impl MilvusVectorStore {
    /// Connect to Milvus and create the collection if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the server is unreachable or
    /// rejects the collection.
    pub async fn connect(config: MilvusConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Self::err(format!("failed to build HTTP client: {e}")))?;
        let store = Self { client, config };
        store.ensure_collection().await?;
        Ok(store)
    }

    /// The collection this store writes to.
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    fn err(message: impl Into<String>) -> RagError {
        RagError::VectorStore { backend: BACKEND.to_string(), message: message.into() }
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<Option<T>> {
        let url = format!("{}/v2/vectordb/{path}", self.config.uri.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(backend = BACKEND, path, error = %e, "request failed");
            Self::err(format!("request to {path} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, path, %status, "HTTP error");
            return Err(Self::err(format!("{path} returned {status}: {body}")));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Self::err(format!("failed to parse {path} response: {e}")))?;
        if envelope.code != 0 {
            let message = envelope.message.unwrap_or_default();
            error!(backend = BACKEND, path, code = envelope.code, %message, "API error");
            return Err(Self::err(format!("{path} failed with code {}: {message}", envelope.code)));
        }
        Ok(envelope.data)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let has: Option<HasCollection> = self
            .call("collections/has", json!({ "collectionName": self.config.collection }))
            .await?;
        if has.is_some_and(|h| h.has) {
            debug!(collection = %self.config.collection, "milvus collection already exists");
            return Ok(());
        }

        self.call::<Value>(
            "collections/create",
            json!({
                "collectionName": self.config.collection,
                "dimension": self.config.dimensions,
                "metricType": "COSINE",
                "idType": "Int64",
                "autoID": true,
                "primaryFieldName": "id",
                "vectorFieldName": VECTOR_FIELD,
            }),
        )
        .await?;
        info!(collection = %self.config.collection, dimensions = self.config.dimensions, "created milvus collection");
        Ok(())
    }

    fn entity(embedding: Embedding, chunk: Chunk) -> Value {
        json!({
            VECTOR_FIELD: embedding,
            "chunk_id": chunk.id,
            "text": chunk.text,
            "document_id": chunk.document_id,
            "chunk_index": chunk.index,
            "chunk_offset": chunk.offset,
            "metadata": chunk.metadata,
        })
    }

    async fn insert(&self, entities: Vec<Value>) -> Result<()> {
        let count = entities.len();
        self.call::<Value>(
            "entities/insert",
            json!({ "collectionName": self.config.collection, "data": entities }),
        )
        .await?;
        debug!(collection = %self.config.collection, count, "inserted chunks into milvus");
        Ok(())
    }
}

/// Rebuild a [`RetrievalMatch`] from one search hit.
///
/// Returns the hit's primary key alongside so equal scores can be ordered by
/// insertion (auto ids increase monotonically).
fn match_from_hit(hit: &Map<String, Value>) -> Option<(i64, RetrievalMatch)> {
    let score = hit.get("distance")?.as_f64()? as f32;
    let id = hit.get("id").and_then(Value::as_i64).unwrap_or(i64::MAX);
    let str_field = |name: &str| hit.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    let usize_field =
        |name: &str| hit.get(name).and_then(Value::as_u64).map_or(0, |v| v as usize);
    let metadata: HashMap<String, String> = hit
        .get("metadata")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect()
        })
        .unwrap_or_default();

    let chunk = Chunk {
        id: str_field("chunk_id"),
        text: str_field("text"),
        document_id: str_field("document_id"),
        index: usize_field("chunk_index"),
        offset: usize_field("chunk_offset"),
        metadata,
    };
    Some((id, RetrievalMatch { chunk, score }))
}

#[async_trait]
impl VectorStore for MilvusVectorStore {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn add(&self, embedding: Embedding, chunk: Chunk) -> Result<()> {
        check_dimensions(self.config.dimensions, embedding.len())?;
        self.insert(vec![Self::entity(embedding, chunk)]).await
    }

    async fn add_all(&self, entries: Vec<StoredEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        for entry in &entries {
            check_dimensions(self.config.dimensions, entry.embedding.len())?;
        }
        let entities = entries.into_iter().map(|e| Self::entity(e.embedding, e.chunk)).collect();
        self.insert(entities).await
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalMatch>> {
        check_dimensions(self.config.dimensions, embedding.len())?;
        let hits: Option<Vec<Map<String, Value>>> = self
            .call(
                "entities/search",
                json!({
                    "collectionName": self.config.collection,
                    "data": [embedding],
                    "annsField": VECTOR_FIELD,
                    "limit": top_k,
                    "outputFields": OUTPUT_FIELDS,
                }),
            )
            .await?;

        let mut scored: Vec<(i64, RetrievalMatch)> =
            hits.unwrap_or_default().iter().filter_map(match_from_hit).collect();
        scored.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, m)| m).collect())
    }

    async fn len(&self) -> Result<usize> {
        let rows: Option<Vec<Map<String, Value>>> = self
            .call(
                "entities/query",
                json!({
                    "collectionName": self.config.collection,
                    "filter": "",
                    "outputFields": ["count(*)"],
                }),
            )
            .await?;
        let count = rows
            .unwrap_or_default()
            .first()
            .and_then(|row| row.get("count(*)"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        self.call::<Value>(
            "collections/drop",
            json!({ "collectionName": self.config.collection }),
        )
        .await?;
        info!(collection = %self.config.collection, "dropped milvus collection");
        self.ensure_collection().await
    }
}
