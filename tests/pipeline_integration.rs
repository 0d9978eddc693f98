//! End-to-end pipeline behavior: batch accounting, isolation between
//! concurrent batches, drain idempotence, and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docflow::config::PipelineConfig;
use docflow::extract::{Extractor, Utf8Extractor};
use docflow::pipeline::{Document, ExtractError, LifecycleError, Pipeline};
use docflow::summarize::{ExtractiveSummarizer, SummarizeOptions, Summarizer};
use tokio::time::timeout;

fn text_document(name: &str, text: &str) -> Document {
    Document::new(name, text.as_bytes().to_vec())
}

fn corrupt_document(name: &str) -> Document {
    Document::new(name, vec![0xFF, 0xFE, 0x00, 0x01])
}

fn build_pipeline(extract_workers: usize, summarize_workers: usize) -> Pipeline {
    let config = PipelineConfig {
        extract_workers,
        summarize_workers,
        ..PipelineConfig::default()
    };
    Pipeline::new(
        &config,
        Arc::new(Utf8Extractor::new()),
        Arc::new(ExtractiveSummarizer::new(SummarizeOptions::default())),
    )
}

/// Extractor that takes a while per document, to keep work in flight.
struct SlowExtractor {
    inner: Utf8Extractor,
    delay: Duration,
}

#[async_trait]
impl Extractor for SlowExtractor {
    async fn extract(&self, document: Document) -> Result<String, ExtractError> {
        tokio::time::sleep(self.delay).await;
        self.inner.extract(document).await
    }
}

/// Summarizer that echoes its input, to observe payloads end to end.
struct EchoSummarizer;

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(
        &self,
        text: String,
    ) -> Result<String, docflow::pipeline::SummarizeError> {
        Ok(format!("summary of: {text}"))
    }
}

#[tokio::test]
async fn every_document_reaches_exactly_one_terminal_outcome() {
    let mut pipeline = build_pipeline(3, 2);
    pipeline.start().expect("start");

    let documents: Vec<Document> = (0..10)
        .map(|i| text_document(&format!("doc-{i}"), &format!("Content of document {i}.")))
        .collect();
    let handle = pipeline.submit(documents).await.expect("submit");

    let outcome = handle.collect().await;
    assert_eq!(outcome.summaries.len() + outcome.failures.len(), 10);

    // Each sequence number appears exactly once across both sinks.
    let mut sequences: Vec<usize> = outcome
        .summaries
        .iter()
        .map(|(sequence, _)| *sequence)
        .chain(outcome.failures.iter().map(|(sequence, _)| *sequence))
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (0..10).collect::<Vec<_>>());

    pipeline.await_drain().await;
    pipeline.shutdown_gracefully().await.expect("shutdown");
}

#[tokio::test]
async fn concurrent_batches_complete_independently() {
    let mut pipeline = build_pipeline(2, 2);
    pipeline.start().expect("start");

    let batch_a: Vec<Document> = (0..5)
        .map(|i| text_document(&format!("a-{i}"), "Batch A content."))
        .collect();
    let batch_b: Vec<Document> = (0..3)
        .map(|i| text_document(&format!("b-{i}"), "Batch B content."))
        .collect();

    let handle_a = pipeline.submit(batch_a).await.expect("submit a");
    let handle_b = pipeline.submit(batch_b).await.expect("submit b");

    // Batch A completes regardless of what B is doing.
    timeout(Duration::from_secs(5), handle_a.wait())
        .await
        .expect("batch A completes");
    assert_eq!(handle_a.pending(), 0);

    let outcome_a = handle_a.collect().await;
    let outcome_b = handle_b.collect().await;
    assert_eq!(outcome_a.summaries.len(), 5);
    assert_eq!(outcome_b.summaries.len(), 3);
    assert_eq!(
        outcome_a.summaries.len() + outcome_b.summaries.len(),
        8,
        "total deliveries across both batches"
    );

    pipeline.shutdown_gracefully().await.expect("shutdown");
}

#[tokio::test]
async fn await_drain_is_idempotent() {
    let mut pipeline = build_pipeline(2, 1);
    pipeline.start().expect("start");

    let handle = pipeline
        .submit(vec![text_document("only", "One document to drain.")])
        .await
        .expect("submit");
    pipeline.await_drain().await;
    assert_eq!(handle.pending(), 0);

    // No new submissions: both calls must return immediately.
    timeout(Duration::from_millis(100), pipeline.await_drain())
        .await
        .expect("second drain immediate");
    timeout(Duration::from_millis(100), pipeline.await_drain())
        .await
        .expect("third drain immediate");

    pipeline.shutdown_gracefully().await.expect("shutdown");
}

#[tokio::test]
async fn failure_is_isolated_within_a_batch() {
    let mut pipeline = build_pipeline(2, 2);
    pipeline.start().expect("start");

    let documents = vec![
        text_document("doc-0", "First healthy document."),
        text_document("doc-1", "Second healthy document."),
        corrupt_document("doc-2"),
        text_document("doc-3", "Fourth healthy document."),
        text_document("doc-4", "Fifth healthy document."),
    ];
    let handle = pipeline.submit(documents).await.expect("submit");
    let outcome = handle.collect().await;

    assert_eq!(outcome.summaries.len(), 4);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, 2);

    pipeline.shutdown_gracefully().await.expect("shutdown");
}

#[tokio::test]
async fn graceful_shutdown_preserves_in_flight_work() {
    let config = PipelineConfig {
        extract_workers: 2,
        summarize_workers: 1,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(
        &config,
        Arc::new(SlowExtractor {
            inner: Utf8Extractor::new(),
            delay: Duration::from_millis(20),
        }),
        Arc::new(EchoSummarizer),
    );
    pipeline.start().expect("start");

    let documents: Vec<Document> = (0..6)
        .map(|i| text_document(&format!("slow-{i}"), &format!("Slow document {i}.")))
        .collect();
    let handle = pipeline.submit(documents).await.expect("submit");

    // Shut down while extraction is still chewing on the batch.
    pipeline.shutdown_gracefully().await.expect("shutdown");

    let outcome = handle.collect().await;
    assert_eq!(
        outcome.summaries.len() + outcome.failures.len(),
        6,
        "no item enqueued before shutdown may be lost"
    );
    assert_eq!(outcome.failures.len(), 0);

    // Stopped pipelines reject further work.
    let late = pipeline.submit(vec![text_document("late", "Too late.")]).await;
    assert!(matches!(late, Err(LifecycleError::Stopped)));
}

#[tokio::test]
async fn mixed_batch_with_small_pools_matches_expected_counts() {
    // 2 extraction workers, 1 summarization worker; doc3's extraction fails.
    let config = PipelineConfig {
        extract_workers: 2,
        summarize_workers: 1,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(
        &config,
        Arc::new(Utf8Extractor::new()),
        Arc::new(EchoSummarizer),
    );
    pipeline.start().expect("start");

    let documents = vec![
        text_document("doc-1", "short text"),
        text_document("doc-2", "long text with considerably more words in it"),
        corrupt_document("doc-3"),
    ];
    let handle = pipeline.submit(documents).await.expect("submit");
    let outcome = handle.collect().await;

    assert_eq!(outcome.summaries.len(), 2, "doc1 and doc2, in any order");
    assert_eq!(outcome.failures.len(), 1, "doc3's extraction error");
    assert_eq!(outcome.failures[0].0, 2);

    let summaries: Vec<&String> = outcome.summaries.iter().map(|(_, text)| text).collect();
    assert!(summaries.iter().any(|text| text.contains("short text")));
    assert!(summaries.iter().any(|text| text.contains("long text")));

    pipeline.shutdown_gracefully().await.expect("shutdown");
}

#[tokio::test]
async fn bounded_queues_still_complete_batches() {
    let config = PipelineConfig {
        extract_workers: 2,
        summarize_workers: 1,
        queue_capacity: Some(2),
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(
        &config,
        Arc::new(Utf8Extractor::new()),
        Arc::new(ExtractiveSummarizer::new(SummarizeOptions::default())),
    );
    pipeline.start().expect("start");

    let documents: Vec<Document> = (0..12)
        .map(|i| text_document(&format!("doc-{i}"), &format!("Backpressure document {i}.")))
        .collect();
    let handle = pipeline.submit(documents).await.expect("submit");
    let outcome = timeout(Duration::from_secs(10), handle.collect())
        .await
        .expect("bounded pipeline makes progress");
    assert_eq!(outcome.summaries.len(), 12);

    pipeline.shutdown_gracefully().await.expect("shutdown");
}

#[tokio::test]
async fn metrics_account_for_every_outcome() {
    let mut pipeline = build_pipeline(2, 2);
    pipeline.start().expect("start");

    let documents = vec![
        text_document("good", "A healthy document."),
        corrupt_document("bad"),
    ];
    let handle = pipeline.submit(documents).await.expect("submit");
    handle.collect().await;
    pipeline.await_drain().await;

    let snapshot = pipeline.metrics_snapshot();
    assert_eq!(snapshot.documents_submitted, 2);
    assert_eq!(
        snapshot.summaries_delivered + snapshot.documents_failed,
        snapshot.documents_submitted
    );

    pipeline.shutdown_gracefully().await.expect("shutdown");
}
