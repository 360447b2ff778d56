//! Document sources.
//!
//! A [`DocumentSource`] hands raw documents to the ingestion pipeline. A
//! missing document is reported as `Ok(None)` so callers can treat it as a
//! non-fatal condition.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Supplies documents by identifier.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load the document `id`, or `Ok(None)` if it does not exist.
    async fn load(&self, id: &str) -> Result<Option<Document>>;

    /// Identifiers of every document the source can load, in a stable order.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Plain-text files in one directory.
///
/// Document ids are file names relative to the directory. Only files with the
/// configured extension (`txt` by default) are listed.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
    extension: String,
}

impl FileSystemSource {
    /// Serve `*.txt` files from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), extension: "txt".to_string() }
    }

    /// Change the listed file extension (without the leading dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The directory documents are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let relative = Path::new(id);
        if relative.is_absolute()
            || relative.components().any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(RagError::Source(format!("document id '{id}' escapes the source directory")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentSource for FileSystemSource {
    async fn load(&self, id: &str) -> Result<Option<Document>> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(path = %path.display(), chars = text.chars().count(), "loaded document");
                let uri = path.canonicalize().unwrap_or(path).display().to_string();
                Ok(Some(Document::new(id, text).with_source_uri(uri)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RagError::Source(format!("failed to read '{}': {e}", path.display()))),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches = path.extension().and_then(|ext| ext.to_str()) == Some(self.extension.as_str());
            if matches && entry.file_type().await?.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
