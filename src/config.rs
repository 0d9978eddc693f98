use crate::summarize::SummarizeOptions;
use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed or is out of range.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for a [`crate::pipeline::Pipeline`].
///
/// Every field has a default, so a pipeline can be constructed without any
/// environment at all. The configuration is a plain value handed to
/// `Pipeline::new` rather than ambient global state, which keeps concurrently
/// constructed pipelines (and tests) independent of each other.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent extraction workers (I/O-bound stage).
    pub extract_workers: usize,
    /// Number of concurrent summarization workers (compute-bound stage).
    pub summarize_workers: usize,
    /// Optional bound on queue depth; enqueueing awaits free space when set.
    pub queue_capacity: Option<usize>,
    /// Options forwarded to the summarization backend.
    pub summarize: SummarizeOptions,
    /// Base URL of an Ollama runtime used for abstractive summaries.
    pub ollama_url: Option<String>,
    /// Model identifier enabling the Ollama summarizer; extractive fallback when unset.
    pub summarize_model: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extract_workers: 4,
            summarize_workers: 2,
            queue_capacity: None,
            summarize: SummarizeOptions::default(),
            ollama_url: None,
            summarize_model: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let config = Self {
            extract_workers: load_env_parsed("DOCFLOW_EXTRACT_WORKERS")?
                .unwrap_or(defaults.extract_workers),
            summarize_workers: load_env_parsed("DOCFLOW_SUMMARIZE_WORKERS")?
                .unwrap_or(defaults.summarize_workers),
            queue_capacity: load_env_parsed("DOCFLOW_QUEUE_CAPACITY")?,
            summarize: SummarizeOptions {
                max_words: load_env_parsed("DOCFLOW_SUMMARY_MAX_WORDS")?
                    .unwrap_or(defaults.summarize.max_words),
                min_words: load_env_parsed("DOCFLOW_SUMMARY_MIN_WORDS")?
                    .unwrap_or(defaults.summarize.min_words),
                deterministic: load_env_parsed("DOCFLOW_SUMMARY_DETERMINISTIC")?
                    .unwrap_or(defaults.summarize.deterministic),
            },
            ollama_url: load_env_optional("OLLAMA_URL"),
            summarize_model: load_env_optional("DOCFLOW_SUMMARY_MODEL"),
        };
        let config = config.validated()?;
        tracing::debug!(
            extract_workers = config.extract_workers,
            summarize_workers = config.summarize_workers,
            queue_capacity = ?config.queue_capacity,
            summarize_model = ?config.summarize_model,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject configurations a pipeline cannot run with.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.extract_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "DOCFLOW_EXTRACT_WORKERS must be at least 1".to_string(),
            ));
        }
        if self.summarize_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "DOCFLOW_SUMMARIZE_WORKERS must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::InvalidValue(
                "DOCFLOW_QUEUE_CAPACITY must be at least 1 when set".to_string(),
            ));
        }
        if self.summarize.min_words > self.summarize.max_words {
            return Err(ConfigError::InvalidValue(
                "DOCFLOW_SUMMARY_MIN_WORDS must not exceed DOCFLOW_SUMMARY_MAX_WORDS".to_string(),
            ));
        }
        Ok(self)
    }
}

fn load_env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
