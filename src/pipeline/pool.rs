//! Fixed-size worker pools with sentinel-based graceful shutdown.
//!
//! A pool spawns `size` tokio tasks that loop over one shared input queue,
//! apply the stage transform, and hand successful output to an
//! [`OutputPort`]. Shutdown enqueues exactly one [`Envelope::Shutdown`]
//! sentinel per worker; a worker consuming a sentinel exits after finishing
//! its in-flight item, so stopping is graceful, never preemptive. Per-item
//! errors are reported on the item's scope and never terminate a worker.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::queue::WorkQueue;
use super::scope::WorkItem;
use super::types::{DocumentError, LifecycleError};

/// Queue value consumed by pool workers: a unit of work or a stop signal.
pub enum Envelope<T> {
    /// A work item to transform.
    Item(WorkItem<T>),
    /// Sentinel instructing the worker that dequeues it to exit.
    Shutdown,
}

/// Transformation applied by one pipeline stage.
#[async_trait]
pub trait StageTransform<In, Out>: Send + Sync {
    /// Apply the stage transformation to one payload.
    async fn apply(&self, input: In) -> Result<Out, DocumentError>;
}

/// Destination for a stage's successful output.
#[async_trait]
pub trait OutputPort<Out>: Send + Sync {
    /// Accept a transformed work item.
    async fn accept(&self, item: WorkItem<Out>);
}

/// Forwards stage output into the next stage's queue.
pub struct QueuePort<T> {
    next: Arc<WorkQueue<Envelope<T>>>,
}

impl<T> QueuePort<T> {
    /// Build a port that re-enqueues output into `next`.
    pub fn new(next: Arc<WorkQueue<Envelope<T>>>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl<T: Send + 'static> OutputPort<T> for QueuePort<T> {
    async fn accept(&self, item: WorkItem<T>) {
        self.next.enqueue(Envelope::Item(item)).await;
    }
}

/// Terminal port delivering summaries back to the originating request scope.
pub struct DeliveryPort;

#[async_trait]
impl OutputPort<String> for DeliveryPort {
    async fn accept(&self, item: WorkItem<String>) {
        item.scope.deliver(item.sequence, item.payload);
    }
}

enum PoolState {
    Created,
    Running,
    Stopped,
}

/// Fixed-size set of concurrent workers sharing one input queue.
///
/// Single-use: Created → `start` → Running → `stop` → Stopped. Restarting a
/// stopped pool fails with [`LifecycleError::Stopped`]; construct a fresh
/// pool instead.
pub struct WorkerPool<In, Out> {
    name: &'static str,
    size: usize,
    transform: Arc<dyn StageTransform<In, Out>>,
    input: Arc<WorkQueue<Envelope<In>>>,
    output: Arc<dyn OutputPort<Out>>,
    workers: Vec<JoinHandle<()>>,
    state: PoolState,
}

impl<In: Send + 'static, Out: Send + 'static> WorkerPool<In, Out> {
    /// Assemble a pool over the given queue and output port without starting it.
    pub fn new(
        name: &'static str,
        size: usize,
        transform: Arc<dyn StageTransform<In, Out>>,
        input: Arc<WorkQueue<Envelope<In>>>,
        output: Arc<dyn OutputPort<Out>>,
    ) -> Self {
        Self {
            name,
            size,
            transform,
            input,
            output,
            workers: Vec::with_capacity(size),
            state: PoolState::Created,
        }
    }

    /// Number of workers this pool was configured with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawn the worker tasks. Valid only once, from the created state.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            PoolState::Created => {}
            PoolState::Running => return Err(LifecycleError::AlreadyRunning),
            PoolState::Stopped => return Err(LifecycleError::Stopped),
        }
        for worker in 0..self.size {
            let transform = Arc::clone(&self.transform);
            let input = Arc::clone(&self.input);
            let output = Arc::clone(&self.output);
            let pool = self.name;
            self.workers.push(tokio::spawn(async move {
                run_worker(pool, worker, transform, input, output).await;
            }));
        }
        self.state = PoolState::Running;
        tracing::debug!(pool = self.name, workers = self.size, "Worker pool started");
        Ok(())
    }

    /// Issue one shutdown sentinel per worker, then join every worker task.
    ///
    /// Workers finish whatever item they are processing before consuming
    /// their sentinel; items enqueued after this call are never dequeued.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            PoolState::Running => {}
            PoolState::Created => return Err(LifecycleError::NotRunning),
            PoolState::Stopped => return Err(LifecycleError::Stopped),
        }
        for _ in 0..self.size {
            self.input.force_enqueue(Envelope::Shutdown);
        }
        for handle in self.workers.drain(..) {
            if let Err(error) = handle.await {
                tracing::error!(pool = self.name, %error, "Worker task failed during shutdown");
            }
        }
        self.state = PoolState::Stopped;
        tracing::debug!(pool = self.name, "Worker pool stopped");
        Ok(())
    }
}

async fn run_worker<In, Out>(
    pool: &'static str,
    worker: usize,
    transform: Arc<dyn StageTransform<In, Out>>,
    input: Arc<WorkQueue<Envelope<In>>>,
    output: Arc<dyn OutputPort<Out>>,
) {
    loop {
        match input.dequeue().await {
            Envelope::Shutdown => {
                input.mark_done();
                tracing::trace!(pool, worker, "Worker consumed shutdown sentinel");
                break;
            }
            Envelope::Item(item) => {
                let WorkItem {
                    payload,
                    scope,
                    sequence,
                } = item;
                match transform.apply(payload).await {
                    Ok(transformed) => {
                        // Forward before mark_done so the drain barrier can
                        // never observe this stage finished while its output
                        // has yet to land downstream.
                        output
                            .accept(WorkItem::new(transformed, scope, sequence))
                            .await;
                    }
                    Err(error) => {
                        tracing::debug!(
                            pool,
                            worker,
                            batch = %scope.id(),
                            sequence,
                            %error,
                            "Work item failed"
                        );
                        scope.report_error(sequence, error);
                    }
                }
                input.mark_done();
            }
        }
    }
}
