//! Core data types and error definitions for the processing pipeline.

use thiserror::Error;

/// A source document submitted to the pipeline for extraction and summarization.
#[derive(Debug, Clone)]
pub struct Document {
    /// Human-readable name used in diagnostics and error messages.
    pub name: String,
    /// Raw document bytes; interpretation belongs to the extractor.
    pub content: Vec<u8>,
}

impl Document {
    /// Build a document from a name and its raw bytes.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Errors raised while extracting text from a source document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Document bytes did not decode with the expected encoding.
    #[error("document '{name}' is not valid UTF-8: {source}")]
    InvalidEncoding {
        /// Name of the offending document.
        name: String,
        /// Underlying decoding error.
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// Document could not be read or parsed at all.
    #[error("document '{name}' could not be read: {reason}")]
    Unreadable {
        /// Name of the offending document.
        name: String,
        /// Description of what went wrong while reading.
        reason: String,
    },
    /// Document decoded cleanly but contained no text worth summarizing.
    #[error("document '{name}' contains no extractable text")]
    Empty {
        /// Name of the offending document.
        name: String,
    },
}

/// Errors raised while condensing extracted text into a summary.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Input exceeds what the backend is willing to condense.
    #[error("input of {words} words exceeds the {limit} word limit")]
    InputTooLarge {
        /// Word count of the rejected input.
        words: usize,
        /// Maximum input size accepted by the backend.
        limit: usize,
    },
    /// Backend was unreachable or explicitly disabled.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Backend returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Backend response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Terminal failure for a single document, reported on its batch and never
/// propagated across the queue boundary.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The extraction stage rejected the document.
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    /// The summarization stage rejected the extracted text.
    #[error("summarization failed: {0}")]
    Summarize(#[from] SummarizeError),
}

/// Operation invalid for the current pipeline or worker-pool state.
///
/// Pools and pipelines are single-use: Created → Running → Stopped, with no
/// way back. Lifecycle misuse surfaces synchronously to the offending caller
/// instead of travelling through result sinks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start` was issued twice for the same instance.
    #[error("start was already issued for this instance")]
    AlreadyRunning,
    /// The operation requires a running instance.
    #[error("operation requires a running instance")]
    NotRunning,
    /// The instance was stopped and cannot be reused.
    #[error("instance has been stopped and cannot be reused")]
    Stopped,
}
