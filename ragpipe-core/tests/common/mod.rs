//! Deterministic backends shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ragpipe_core::{Embedding, EmbeddingProvider, Generator, RagError, Result};

pub const DIM: usize = 256;

/// Bag-of-words embedding: each lowercase word is hashed into one of `DIM` buckets.
///
/// Texts sharing words get a positive cosine similarity; texts sharing none
/// score (almost always) zero.
pub fn bag_of_words(text: &str) -> Embedding {
    let mut v = vec![0.0f32; DIM];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        v[(hash % DIM as u64) as usize] += 1.0;
    }
    v
}

/// Embeds with [`bag_of_words`] and counts calls. Texts containing `fail_on` are rejected.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
    pub fail_on: Option<String>,
}

impl HashEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self { calls: AtomicUsize::new(0), fail_on: Some(marker.to_string()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(RagError::Embedding {
                    provider: "hash".into(),
                    message: format!("refusing text containing '{marker}'"),
                });
            }
        }
        Ok(bag_of_words(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Sleeps on every call and records the highest number of calls in flight.
#[derive(Default)]
pub struct SlowEmbedder {
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(bag_of_words(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Always fails.
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Err(RagError::Embedding { provider: "down".into(), message: "connection refused".into() })
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Returns a fixed reply and records every prompt.
pub struct RecordingGenerator {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Always fails.
pub struct DownGenerator;

#[async_trait]
impl Generator for DownGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::Generation { provider: "down".into(), message: "model not loaded".into() })
    }
}
