use async_trait::async_trait;

use crate::pipeline::types::{Document, ExtractError};

/// Interface implemented by text extraction backends.
///
/// Extraction is an opaque capability from the pipeline's point of view;
/// only the success or failure of a document matters to the coordination
/// layer. Implementations must not share mutable state without their own
/// synchronization, since every extraction worker calls them concurrently.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Pull the plain text out of one source document.
    async fn extract(&self, document: Document) -> Result<String, ExtractError>;
}

/// Deterministic extractor for plain UTF-8 text documents.
///
/// Serves the CLI and tests without external tooling; PDF or OCR backends
/// plug in through the same trait.
pub struct Utf8Extractor;

impl Utf8Extractor {
    /// Construct a new extractor instance.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for Utf8Extractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for Utf8Extractor {
    async fn extract(&self, document: Document) -> Result<String, ExtractError> {
        let Document { name, content } = document;
        let text = String::from_utf8(content).map_err(|source| ExtractError::InvalidEncoding {
            name: name.clone(),
            source,
        })?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ExtractError::Empty { name });
        }
        tracing::debug!(document = %name, chars = trimmed.len(), "Extracted text");
        Ok(trimmed.to_string())
    }
}
