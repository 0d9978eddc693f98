//! Abstractions for condensing extracted text into summaries.
//!
//! The summarization capability is opaque to the pipeline; it only needs the
//! success/failure signal. Two backends ship with the crate: a deterministic
//! extractive summarizer that needs no external services, and an
//! Ollama-backed client that issues HTTP requests directly to the runtime.
//! Both honor the same word-budget options.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::pipeline::types::SummarizeError;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Inputs larger than this are rejected rather than condensed.
const MAX_INPUT_WORDS: usize = 100_000;

/// Options recognized by summarization backends.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SummarizeOptions {
    /// Upper bound on the number of words in the produced summary.
    pub max_words: usize,
    /// Lower bound the backend aims for when enough input is available.
    pub min_words: usize,
    /// Disable sampling-based variation so repeated runs produce identical output.
    pub deterministic: bool,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_words: 130,
            min_words: 30,
            deterministic: true,
        }
    }
}

/// Interface implemented by summarization backends.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense extracted text into a summary.
    async fn summarize(&self, text: String) -> Result<String, SummarizeError>;
}

/// Build a summarizer based on configuration: Ollama when a model is
/// configured, the deterministic extractive fallback otherwise.
pub fn get_summarizer(config: &PipelineConfig) -> Arc<dyn Summarizer> {
    match &config.summarize_model {
        Some(model) => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Arc::new(OllamaSummarizer::new(
                base_url,
                model.clone(),
                config.summarize,
            ))
        }
        None => Arc::new(ExtractiveSummarizer::new(config.summarize)),
    }
}

/// Deterministic summarizer that keeps leading sentences within a word budget.
pub struct ExtractiveSummarizer {
    options: SummarizeOptions,
}

impl ExtractiveSummarizer {
    /// Construct an extractive summarizer with the given word budget.
    pub fn new(options: SummarizeOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, text: String) -> Result<String, SummarizeError> {
        let total_words = count_words(&text);
        if total_words > MAX_INPUT_WORDS {
            return Err(SummarizeError::InputTooLarge {
                words: total_words,
                limit: MAX_INPUT_WORDS,
            });
        }

        let mut kept = Vec::new();
        let mut used_words = 0usize;
        for sentence in sentences(&text) {
            let words = count_words(sentence);
            if words == 0 {
                continue;
            }
            if !kept.is_empty()
                && used_words >= self.options.min_words
                && used_words + words > self.options.max_words
            {
                break;
            }
            used_words += words;
            kept.push(sentence.trim());
            if used_words >= self.options.max_words {
                break;
            }
        }

        if kept.is_empty() {
            // Whitespace-only input still gets a stable, bounded answer.
            return Ok(truncate_words(&text, self.options.max_words));
        }

        let mut summary = kept.join(". ");
        summary.push('.');
        Ok(truncate_words(&summary, self.options.max_words))
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Summarizer backed by an Ollama runtime's `/api/generate` endpoint.
pub struct OllamaSummarizer {
    http: Client,
    base_url: String,
    model: String,
    options: SummarizeOptions,
}

impl OllamaSummarizer {
    /// Construct a client for the given Ollama base URL and model.
    pub fn new(base_url: String, model: String, options: SummarizeOptions) -> Self {
        let http = Client::builder()
            .user_agent("docflow/summarize")
            .build()
            .expect("Failed to construct reqwest::Client for summarization");
        Self {
            http,
            base_url,
            model,
            options,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            "System: You condense documents into concise, factual summaries. \
             Prefer neutral tone. Avoid speculation. Return between {min} and \
             {max} words as a single paragraph.\n\nSummarize the following \
             text.\n\n{text}",
            min = self.options.min_words,
            max = self.options.max_words,
        )
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, text: String) -> Result<String, SummarizeError> {
        let words = count_words(&text);
        if words > MAX_INPUT_WORDS {
            return Err(SummarizeError::InputTooLarge {
                words,
                limit: MAX_INPUT_WORDS,
            });
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": self.build_prompt(&text),
            "stream": false,
        });
        if self.options.deterministic {
            payload["options"] = json!({
                "temperature": 0.0,
                "seed": 42,
            });
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizeError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizeError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizeError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(SummarizeError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn small_budget() -> SummarizeOptions {
        SummarizeOptions {
            max_words: 8,
            min_words: 2,
            deterministic: true,
        }
    }

    #[tokio::test]
    async fn extractive_summary_respects_word_budget() {
        let summarizer = ExtractiveSummarizer::new(small_budget());
        let text = "First sentence here. Second sentence follows along. \
                    Third sentence adds more detail. Fourth sentence is ignored."
            .to_string();
        let summary = summarizer.summarize(text).await.expect("summary");
        assert!(count_words(&summary) <= 8);
        assert!(summary.contains("First sentence here"));
    }

    #[tokio::test]
    async fn extractive_summary_is_deterministic() {
        let summarizer = ExtractiveSummarizer::new(small_budget());
        let text = "Deterministic input. Same every time. No sampling involved.".to_string();
        let first = summarizer.summarize(text.clone()).await.expect("summary");
        let second = summarizer.summarize(text).await.expect("summary");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn extractive_summary_rejects_oversized_input() {
        let summarizer = ExtractiveSummarizer::new(SummarizeOptions::default());
        let text = "word ".repeat(MAX_INPUT_WORDS + 1);
        let error = summarizer.summarize(text).await.expect_err("too large");
        assert!(matches!(error, SummarizeError::InputTooLarge { .. }));
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let summarizer = OllamaSummarizer::new(
            server.base_url(),
            "llama".into(),
            SummarizeOptions::default(),
        );

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "Summary text",
                    "done": true
                }));
            })
            .await;

        let summary = summarizer
            .summarize("A document worth condensing.".into())
            .await
            .expect("summary");

        mock.assert();
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let summarizer = OllamaSummarizer::new(
            server.base_url(),
            "llama".into(),
            SummarizeOptions::default(),
        );

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = summarizer
            .summarize("A document worth condensing.".into())
            .await
            .expect_err("error response");
        assert!(matches!(error, SummarizeError::GenerationFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn ollama_client_rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        let summarizer = OllamaSummarizer::new(
            server.base_url(),
            "llama".into(),
            SummarizeOptions::default(),
        );

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "partial",
                    "done": false
                }));
            })
            .await;

        let error = summarizer
            .summarize("A document worth condensing.".into())
            .await
            .expect_err("incomplete response");
        assert!(matches!(error, SummarizeError::InvalidResponse(_)));
    }
}
