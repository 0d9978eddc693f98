//! Two-stage concurrent document processing pipeline.
//!
//! Documents flow through two independently sized worker pools connected by
//! shared queues: extraction workers pull from the document queue and feed
//! extracted text into the text queue, where summarization workers condense
//! it and deliver results back to the submitting batch's scope.
//!
//! Highlights:
//!
//! - Explicit lifecycle: a [`Pipeline`] is an owned value (Created → Running
//!   → Stopped), constructed with its configuration and capabilities rather
//!   than looked up as module-global state. One long-lived pipeline serves
//!   many batches; `shutdown_gracefully` belongs at process teardown.
//! - Batch isolation: each `submit` gets its own [`RequestScope`], so
//!   concurrently submitted batches interleave in the shared queues without
//!   their results mixing.
//! - Ordering: FIFO holds within each queue, but completion order is not
//!   guaranteed end to end. Two documents submitted as A then B may finish
//!   as B then A when A's extraction takes longer. This is intentional;
//!   correlate results through sequence numbers, not arrival order.
//! - Failure isolation: a document failing either stage is reported on its
//!   batch and never blocks or poisons sibling documents.

pub mod pool;
pub mod queue;
pub mod scope;
pub mod types;

pub use pool::{DeliveryPort, Envelope, OutputPort, QueuePort, StageTransform, WorkerPool};
pub use queue::WorkQueue;
pub use scope::{BatchHandle, BatchOutcome, BatchUpdate, RequestScope, WorkItem, open_batch};
pub use types::{Document, DocumentError, ExtractError, LifecycleError, SummarizeError};

use crate::config::PipelineConfig;
use crate::extract::Extractor;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::summarize::Summarizer;
use async_trait::async_trait;
use std::sync::Arc;

struct ExtractStage {
    extractor: Arc<dyn Extractor>,
    metrics: Arc<PipelineMetrics>,
}

#[async_trait]
impl StageTransform<Document, String> for ExtractStage {
    async fn apply(&self, input: Document) -> Result<String, DocumentError> {
        match self.extractor.extract(input).await {
            Ok(text) => {
                self.metrics.record_extracted();
                Ok(text)
            }
            Err(error) => {
                self.metrics.record_failed();
                Err(error.into())
            }
        }
    }
}

struct SummarizeStage {
    summarizer: Arc<dyn Summarizer>,
    metrics: Arc<PipelineMetrics>,
}

#[async_trait]
impl StageTransform<String, String> for SummarizeStage {
    async fn apply(&self, input: String) -> Result<String, DocumentError> {
        match self.summarizer.summarize(input).await {
            Ok(summary) => {
                self.metrics.record_delivered();
                Ok(summary)
            }
            Err(error) => {
                self.metrics.record_failed();
                Err(error.into())
            }
        }
    }
}

enum PipelineState {
    Created,
    Running,
    Stopped,
}

/// Two worker pools and their connecting queues, managed as one lifecycle.
pub struct Pipeline {
    document_queue: Arc<WorkQueue<Envelope<Document>>>,
    text_queue: Arc<WorkQueue<Envelope<String>>>,
    extract_pool: WorkerPool<Document, String>,
    summarize_pool: WorkerPool<String, String>,
    metrics: Arc<PipelineMetrics>,
    state: PipelineState,
}

impl Pipeline {
    /// Assemble a pipeline from its configuration and stage capabilities.
    ///
    /// Nothing runs until [`Pipeline::start`] is called.
    pub fn new(
        config: &PipelineConfig,
        extractor: Arc<dyn Extractor>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let document_queue = Arc::new(build_queue(config.queue_capacity));
        let text_queue = Arc::new(build_queue(config.queue_capacity));
        let metrics = Arc::new(PipelineMetrics::new());

        let extract_pool = WorkerPool::new(
            "extract",
            config.extract_workers,
            Arc::new(ExtractStage {
                extractor,
                metrics: Arc::clone(&metrics),
            }),
            Arc::clone(&document_queue),
            Arc::new(QueuePort::new(Arc::clone(&text_queue))),
        );
        let summarize_pool = WorkerPool::new(
            "summarize",
            config.summarize_workers,
            Arc::new(SummarizeStage {
                summarizer,
                metrics: Arc::clone(&metrics),
            }),
            Arc::clone(&text_queue),
            Arc::new(DeliveryPort),
        );

        Self {
            document_queue,
            text_queue,
            extract_pool,
            summarize_pool,
            metrics,
            state: PipelineState::Created,
        }
    }

    /// Spawn both worker pools. Valid only once, from the created state.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            PipelineState::Created => {}
            PipelineState::Running => return Err(LifecycleError::AlreadyRunning),
            PipelineState::Stopped => return Err(LifecycleError::Stopped),
        }
        self.extract_pool.start()?;
        self.summarize_pool.start()?;
        self.state = PipelineState::Running;
        tracing::info!(
            extract_workers = self.extract_pool.size(),
            summarize_workers = self.summarize_pool.size(),
            "Pipeline started"
        );
        Ok(())
    }

    /// Submit a batch of documents, returning its handle immediately.
    ///
    /// Processing happens on the worker pools; the call itself only enqueues
    /// (awaiting queue space when a capacity bound is configured). Completion
    /// is observed through the handle: [`BatchHandle::next_update`] streams
    /// terminal outcomes, [`BatchHandle::wait`] resolves when the batch's
    /// pending count reaches zero.
    pub async fn submit(&self, documents: Vec<Document>) -> Result<BatchHandle, LifecycleError> {
        match self.state {
            PipelineState::Running => {}
            PipelineState::Created => return Err(LifecycleError::NotRunning),
            PipelineState::Stopped => return Err(LifecycleError::Stopped),
        }
        let (scope, handle) = open_batch(documents.len());
        tracing::info!(
            batch = %scope.id(),
            documents = documents.len(),
            "Batch submitted"
        );
        self.metrics.record_submitted(documents.len() as u64);
        for (sequence, document) in documents.into_iter().enumerate() {
            self.document_queue
                .enqueue(Envelope::Item(WorkItem::new(
                    document,
                    Arc::clone(&scope),
                    sequence,
                )))
                .await;
        }
        Ok(handle)
    }

    /// Resolve once every item submitted so far has passed through both
    /// stages and reached a terminal outcome.
    ///
    /// Safe to call repeatedly; with no new submissions it returns
    /// immediately. To wait for a single batch instead, use
    /// [`BatchHandle::wait`].
    pub async fn await_drain(&self) {
        self.document_queue.await_all_done().await;
        self.text_queue.await_all_done().await;
    }

    /// Stop both pools without losing in-flight work.
    ///
    /// Ordering matters: the extraction pool stops first so no new text can
    /// enter the text queue, the text queue is drained, and only then does
    /// the summarization pool receive its sentinels. Every item enqueued
    /// before this call is delivered or errored before the pipeline reports
    /// stopped.
    pub async fn shutdown_gracefully(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            PipelineState::Running => {}
            PipelineState::Created => return Err(LifecycleError::NotRunning),
            PipelineState::Stopped => return Err(LifecycleError::Stopped),
        }
        tracing::info!("Pipeline shutting down");
        self.extract_pool.stop().await?;
        self.text_queue.await_all_done().await;
        self.summarize_pool.stop().await?;
        self.state = PipelineState::Stopped;
        tracing::info!("Pipeline stopped");
        Ok(())
    }

    /// Return the current pipeline throughput snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn build_queue<T>(capacity: Option<usize>) -> WorkQueue<T> {
    match capacity {
        Some(bound) => WorkQueue::bounded(bound),
        None => WorkQueue::new(),
    }
}
