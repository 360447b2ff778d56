//! Configuration for chunking, retrieval and ingestion.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the ingestion pipeline reacts when a single chunk fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestPolicy {
    /// Abort the document on the first failing chunk.
    #[default]
    FailFast,
    /// Record the failure and continue with the remaining chunks.
    BestEffort,
}

impl std::str::FromStr for IngestPolicy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(Self::FailFast),
            "best_effort" => Ok(Self::BestEffort),
            other => Err(RagError::Config(format!("unknown ingest policy '{other}'"))),
        }
    }
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of matches retrieved per query.
    pub top_k: usize,
    /// Maximum number of chunks embedded and stored at the same time.
    pub concurrency: usize,
    /// Failure handling during ingestion.
    pub ingest_policy: IngestPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            concurrency: 1,
            ingest_policy: IngestPolicy::FailFast,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `concurrency == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.concurrency == 0 {
            return Err(RagError::Config("concurrency must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of matches retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set how many chunks may be embedded and stored concurrently.
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.config.concurrency = workers;
        self
    }

    /// Set the per-chunk failure policy for ingestion.
    pub fn ingest_policy(mut self, policy: IngestPolicy) -> Self {
        self.config.ingest_policy = policy;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if validation fails, see [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.ingest_policy, IngestPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_every_field() {
        let config = RagConfig::builder()
            .chunk_size(256)
            .chunk_overlap(32)
            .top_k(5)
            .concurrency(4)
            .ingest_policy(IngestPolicy::BestEffort)
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.chunk_overlap, 32);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.ingest_policy, IngestPolicy::BestEffort);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn rejects_zero_values() {
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().concurrency(0).build().is_err());
    }

    #[test]
    fn deserializes_partial_json_over_defaults() {
        let config: RagConfig =
            serde_json::from_str(r#"{"top_k": 7, "ingest_policy": "best_effort"}"#).unwrap();
        assert_eq!(config.top_k, 7);
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.ingest_policy, IngestPolicy::BestEffort);
    }
}
