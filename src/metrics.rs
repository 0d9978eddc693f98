use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline throughput.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_submitted: AtomicU64,
    texts_extracted: AtomicU64,
    summaries_delivered: AtomicU64,
    documents_failed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch of documents accepted into the pipeline.
    pub fn record_submitted(&self, count: u64) {
        self.documents_submitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one document whose text extraction succeeded.
    pub(crate) fn record_extracted(&self) {
        self.texts_extracted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one summary delivered back to its request scope.
    pub(crate) fn record_delivered(&self) {
        self.summaries_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one document that reached a terminal failure in either stage.
    pub(crate) fn record_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            texts_extracted: self.texts_extracted.load(Ordering::Relaxed),
            summaries_delivered: self.summaries_delivered.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents accepted by `submit` since startup.
    pub documents_submitted: u64,
    /// Number of documents whose extraction stage succeeded.
    pub texts_extracted: u64,
    /// Number of summaries delivered to request scopes.
    pub summaries_delivered: u64,
    /// Number of documents that terminated with an error in either stage.
    pub documents_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_terminal_outcomes() {
        let metrics = PipelineMetrics::new();
        metrics.record_submitted(3);
        metrics.record_extracted();
        metrics.record_extracted();
        metrics.record_delivered();
        metrics.record_delivered();
        metrics.record_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_submitted, 3);
        assert_eq!(snapshot.texts_extracted, 2);
        assert_eq!(snapshot.summaries_delivered, 2);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(
            snapshot.documents_submitted,
            snapshot.summaries_delivered + snapshot.documents_failed
        );
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.snapshot().documents_submitted, 0);
        assert_eq!(metrics.snapshot().summaries_delivered, 0);
    }
}
