//! Per-submission request scopes and batch result delivery.
//!
//! Every `submit` call opens one [`RequestScope`] shared by all work items of
//! that batch. The scope carries the result channel and a pending counter
//! that decrements exactly once per terminal outcome (summary delivered or
//! error reported); reaching zero is the sole authoritative completion
//! signal for the batch. Because each batch has its own scope and channel,
//! concurrently submitted batches share the worker pools without their
//! results ever mixing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

use super::types::DocumentError;

/// One unit of work flowing through a pipeline stage.
///
/// Items are never mutated in place; crossing a stage boundary produces a new
/// item carrying the transformed payload and the same scope.
pub struct WorkItem<T> {
    pub(crate) payload: T,
    pub(crate) scope: Arc<RequestScope>,
    pub(crate) sequence: usize,
}

impl<T> WorkItem<T> {
    /// Wrap a payload for the given scope. `sequence` is the 0-based position
    /// within the batch, carried for diagnostics and update correlation only;
    /// it implies no completion-order guarantee.
    pub fn new(payload: T, scope: Arc<RequestScope>, sequence: usize) -> Self {
        Self {
            payload,
            scope,
            sequence,
        }
    }

    /// The payload carried by this item.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Position of this item within its batch.
    pub fn sequence(&self) -> usize {
        self.sequence
    }
}

/// Terminal outcome for one document, delivered on the batch channel.
#[derive(Debug)]
pub enum BatchUpdate {
    /// The document passed both stages; carries its summary.
    Summarized {
        /// Position of the document within the batch.
        sequence: usize,
        /// The condensed text produced by the summarization stage.
        summary: String,
    },
    /// The document failed in one of the stages.
    Failed {
        /// Position of the document within the batch.
        sequence: usize,
        /// The error that terminated this document.
        error: DocumentError,
    },
}

/// Correlation context shared by every work item of one submission batch.
pub struct RequestScope {
    id: Uuid,
    pending: AtomicUsize,
    completion: Notify,
    updates: mpsc::UnboundedSender<BatchUpdate>,
}

impl RequestScope {
    fn new(pending: usize, updates: mpsc::UnboundedSender<BatchUpdate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pending: AtomicUsize::new(pending),
            completion: Notify::new(),
            updates,
        }
    }

    /// Opaque token correlating results with their submission batch.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of documents in this batch still awaiting a terminal outcome.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolve once every document in the batch has reached a terminal
    /// outcome. Returns immediately when the batch is already complete.
    pub async fn completed(&self) {
        loop {
            let done = self.completion.notified();
            if self.pending() == 0 {
                return;
            }
            done.await;
        }
    }

    /// Deliver one summary and settle the corresponding pending slot.
    pub(crate) fn deliver(&self, sequence: usize, summary: String) {
        // Send fails only when the batch handle was dropped; the caller
        // abandoned the batch, so the result is discarded while accounting
        // continues.
        let _ = self.updates.send(BatchUpdate::Summarized { sequence, summary });
        self.settle();
    }

    /// Report one terminal failure and settle the corresponding pending slot.
    pub(crate) fn report_error(&self, sequence: usize, error: DocumentError) {
        let _ = self.updates.send(BatchUpdate::Failed { sequence, error });
        self.settle();
    }

    fn settle(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "pending count underflow");
        if previous == 1 {
            self.completion.notify_waiters();
        }
    }
}

/// Caller-side view of one submitted batch.
///
/// Dropping the handle abandons the batch: items already enqueued still get
/// processed and the scope keeps counting them, but further deliveries are
/// discarded.
pub struct BatchHandle {
    scope: Arc<RequestScope>,
    updates: mpsc::UnboundedReceiver<BatchUpdate>,
    expected: usize,
    received: usize,
}

/// Open a scope for a batch of `expected` documents, returning the scope to
/// tag work items with and the handle the submitter keeps.
pub fn open_batch(expected: usize) -> (Arc<RequestScope>, BatchHandle) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let scope = Arc::new(RequestScope::new(expected, sender));
    let handle = BatchHandle {
        scope: Arc::clone(&scope),
        updates: receiver,
        expected,
        received: 0,
    };
    (scope, handle)
}

impl BatchHandle {
    /// Identifier of the underlying request scope.
    pub fn id(&self) -> Uuid {
        self.scope.id()
    }

    /// Number of documents still awaiting a terminal outcome.
    pub fn pending(&self) -> usize {
        self.scope.pending()
    }

    /// Resolve once the whole batch has completed, without consuming updates.
    pub async fn wait(&self) {
        self.scope.completed().await;
    }

    /// Receive the next terminal outcome, or `None` once all expected
    /// outcomes have been received.
    pub async fn next_update(&mut self) -> Option<BatchUpdate> {
        if self.received == self.expected {
            return None;
        }
        let update = self.updates.recv().await;
        if update.is_some() {
            self.received += 1;
        }
        update
    }

    /// Drain the batch to completion, splitting outcomes by kind.
    pub async fn collect(mut self) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        while let Some(update) = self.next_update().await {
            match update {
                BatchUpdate::Summarized { sequence, summary } => {
                    outcome.summaries.push((sequence, summary));
                }
                BatchUpdate::Failed { sequence, error } => {
                    outcome.failures.push((sequence, error));
                }
            }
        }
        outcome
    }
}

/// All terminal outcomes of one batch, gathered by [`BatchHandle::collect`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Delivered summaries, tagged with their batch sequence numbers.
    pub summaries: Vec<(usize, String)>,
    /// Terminal failures, tagged with their batch sequence numbers.
    pub failures: Vec<(usize, DocumentError)>,
}
