//! Ollama embedding and generation backends over the Ollama HTTP API.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::Embedding;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::Generator;

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// The default dimensionality of `nomic-embed-text`.
pub const DEFAULT_DIMENSIONS: usize = 768;

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";

/// The default request timeout. Local models can take minutes on first load.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

const PROVIDER: &str = "Ollama";

fn build_client(timeout: Duration) -> std::result::Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Embedding>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Read an error body, preferring Ollama's `{"error": "..."}` message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// # Configuration
///
/// - `base_url` – defaults to `http://localhost:11434`.
/// - `model` – defaults to `nomic-embed-text` (768 dimensions).
/// - `timeout` – per-request timeout, defaults to three minutes.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("http://localhost:11434")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for the Ollama server at `base_url` with default model and timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a provider with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout).map_err(|e| RagError::Embedding {
            provider: PROVIDER.into(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality the model produces.
    ///
    /// Responses of any other length are rejected.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbedRequest { model: &self.model, input: texts.to_vec() };

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/embed"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::Embedding { provider: PROVIDER.into(), message: format!("request failed: {e}") }
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(RagError::Embedding { provider: PROVIDER.into(), message });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Embedding {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::Embedding {
                provider: PROVIDER.into(),
                message: format!(
                    "expected {} embeddings, API returned {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }
        if let Some(bad) = parsed.embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(RagError::DimensionMismatch { expected: self.dimensions, actual: bad.len() });
        }

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`Generator`] backed by Ollama's `/api/generate` endpoint (non-streaming).
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::ollama::OllamaGenerator;
///
/// let generator = OllamaGenerator::new("http://localhost:11434")?.with_model("llama3.2");
/// let text = generator.generate("Hello").await?;
/// ```
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for the Ollama server at `base_url` with default model and timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a generator with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout).map_err(|e| RagError::Generation {
            provider: PROVIDER.into(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client, base_url: base_url.into(), model: DEFAULT_CHAT_MODEL.into() })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = GenerateRequest { model: &self.model, prompt, stream: false };

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/generate"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::Generation { provider: PROVIDER.into(), message: format!("request failed: {e}") }
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(RagError::Generation { provider: PROVIDER.into(), message });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Generation {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        assert_eq!(endpoint("http://h:1/", "api/embed"), "http://h:1/api/embed");
        assert_eq!(endpoint("http://h:1", "api/generate"), "http://h:1/api/generate");
    }

    #[test]
    fn generate_request_disables_streaming() {
        let body = serde_json::to_value(GenerateRequest { model: "m", prompt: "p", stream: false })
            .unwrap();
        assert_eq!(body, serde_json::json!({"model": "m", "prompt": "p", "stream": false}));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_embedding_error() {
        let provider = OllamaEmbeddingProvider::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding { .. }));
    }
}
