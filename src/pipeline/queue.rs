//! Async FIFO work queue with a completion barrier.
//!
//! The queue is the only structure the pipeline's worker tasks mutate
//! concurrently. Besides ordered hand-off it tracks an "unfinished" count:
//! every enqueued value raises it and every [`WorkQueue::mark_done`] lowers
//! it, so [`WorkQueue::await_all_done`] can act as a barrier that resolves
//! once all currently known work has been fully processed, not merely
//! dequeued. Queues never fail; they are a purely in-memory coordination
//! primitive.

use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

struct Inner<T> {
    items: VecDeque<T>,
    unfinished: usize,
}

/// Thread-safe FIFO channel shared by the workers of one pool.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: Option<usize>,
    item_ready: Notify,
    space_ready: Notify,
    quiescent: Notify,
}

impl<T> WorkQueue<T> {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create a queue bounded at `capacity` values; `enqueue` then awaits
    /// free space, applying backpressure to producers.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                unfinished: 0,
            }),
            capacity,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
            quiescent: Notify::new(),
        }
    }

    /// Append a value, awaiting free space when the queue is bounded.
    pub async fn enqueue(&self, mut value: T) {
        if let Some(capacity) = self.capacity {
            loop {
                let space = self.space_ready.notified();
                match self.try_enqueue(value, capacity) {
                    None => {
                        self.item_ready.notify_one();
                        return;
                    }
                    Some(rejected) => value = rejected,
                }
                space.await;
            }
        }
        self.force_enqueue(value);
    }

    /// Push under the capacity bound, handing the value back when full.
    fn try_enqueue(&self, value: T, capacity: usize) -> Option<T> {
        let mut inner = self.lock();
        if inner.items.len() < capacity {
            inner.items.push_back(value);
            inner.unfinished += 1;
            // Same permit hand-off as in `dequeue`: two rapid dequeues may
            // have collapsed into one permit, so a woken producer re-notifies
            // while slots remain. Stray permits are harmless; producers
            // re-check capacity after every wakeup.
            if inner.items.len() < capacity {
                self.space_ready.notify_one();
            }
            None
        } else {
            Some(value)
        }
    }

    /// Append a value regardless of any capacity bound.
    ///
    /// Shutdown sentinels use this path so a full queue can never wedge a
    /// pool's `stop`.
    pub fn force_enqueue(&self, value: T) {
        {
            let mut inner = self.lock();
            inner.items.push_back(value);
            inner.unfinished += 1;
        }
        self.item_ready.notify_one();
    }

    /// Remove and return the oldest value, parking until one is available.
    pub async fn dequeue(&self) -> T {
        loop {
            let ready = self.item_ready.notified();
            {
                let mut inner = self.lock();
                if let Some(value) = inner.items.pop_front() {
                    // `Notify` holds at most one permit, so burst enqueues
                    // can collapse into a single wakeup. Each woken consumer
                    // hands the permit on while values remain, so every
                    // parked worker eventually gets one.
                    if !inner.items.is_empty() {
                        self.item_ready.notify_one();
                    }
                    drop(inner);
                    if self.capacity.is_some() {
                        self.space_ready.notify_one();
                    }
                    return value;
                }
            }
            ready.await;
        }
    }

    /// Report one previously dequeued value as fully processed.
    ///
    /// When the count of `mark_done` calls catches up with the count of
    /// enqueues, waiters on [`WorkQueue::await_all_done`] are released.
    pub fn mark_done(&self) {
        let now_quiescent = {
            let mut inner = self.lock();
            debug_assert!(inner.unfinished > 0, "mark_done without matching enqueue");
            inner.unfinished = inner.unfinished.saturating_sub(1);
            inner.unfinished == 0
        };
        if now_quiescent {
            self.quiescent.notify_waiters();
        }
    }

    /// Barrier: resolve once every enqueued value has been marked done.
    ///
    /// Resolves immediately when the queue is already quiescent, so repeated
    /// calls without new work return right away.
    pub async fn await_all_done(&self) {
        loop {
            let drained = self.quiescent.notified();
            if self.lock().unfinished == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Current number of values waiting in the queue.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the queue currently holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().expect("work queue lock poisoned")
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
