//! Text generation trait consumed by the answerer.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into text.
///
/// Failures (backend unreachable, malformed response) are reported as
/// [`RagError::Generation`](crate::RagError::Generation).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
