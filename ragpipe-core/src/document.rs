//! Data types for documents, chunks, stored entries and search matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A fixed-length embedding vector.
pub type Embedding = Vec<f32>;

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document, usually its source path or file name.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata and no source URI.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach a source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A contiguous segment of a [`Document`].
///
/// `offset` and `len` are measured in characters, not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk (`{document_id}_{index}`).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this chunk in the document's chunk sequence.
    pub index: usize,
    /// Character offset of the chunk's first character in the document.
    pub offset: usize,
    /// Key-value metadata inherited from the parent document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Build the chunk at `index` covering `text`, starting at character `offset`.
    pub fn from_document(document: &Document, index: usize, offset: usize, text: String) -> Self {
        Self {
            id: format!("{}_{index}", document.id),
            text,
            document_id: document.id.clone(),
            index,
            offset,
            metadata: document.metadata.clone(),
        }
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// An embedding paired with the chunk it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEntry {
    /// The chunk's embedding.
    pub embedding: Embedding,
    /// The stored chunk.
    pub chunk: Chunk,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalMatch {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
