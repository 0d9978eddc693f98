#![deny(missing_docs)]

//! Core library for the docflow summarization pipeline.

/// Environment-driven configuration management.
pub mod config;
/// Text extraction capability and adapters.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline throughput metrics helpers.
pub mod metrics;
/// Two-stage concurrent document processing pipeline.
pub mod pipeline;
/// Summarization capability and adapters.
pub mod summarize;
