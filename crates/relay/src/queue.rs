//! Paced, single-consumer relay queue for LINE broadcasts.
//!
//! Batches are delivered strictly in enqueue order with at most one
//! broadcast in flight. After every attempt the drain pauses for the pacing
//! interval. A failed attempt is logged and dropped; nothing is retried.
//!
//! The drain is not a long-lived task. It is armed by [`RelayQueue::enqueue`]
//! when the queue is idle and exits once the queue is empty, so at most one
//! drain runs at any time.

use std::{
    collections::VecDeque,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    futures::FutureExt,
    linecord_channels::BroadcastOutbound,
    linecord_common::{DeliveryOutcome, MessageUnit},
    serde::Serialize,
    tokio::sync::Notify,
    tracing::{debug, warn},
};

/// Snapshot of queue state and lifetime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Batches waiting, including the one in flight.
    pub queued: usize,
    pub draining: bool,
    pub delivered: u64,
    pub dropped: u64,
    /// Number of times an idle queue was re-armed.
    pub drains_started: u64,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<Vec<MessageUnit>>,
    draining: bool,
}

struct Inner {
    outbound: Arc<dyn BroadcastOutbound>,
    pacing: Duration,
    state: Mutex<QueueState>,
    idle: Notify,
    delivered: AtomicU64,
    dropped: AtomicU64,
    drains_started: AtomicU64,
}

/// Handle to the relay queue. Cheap to clone; clones share one queue.
#[derive(Clone)]
pub struct RelayQueue {
    inner: Arc<Inner>,
}

impl RelayQueue {
    pub fn new(outbound: Arc<dyn BroadcastOutbound>, pacing: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                outbound,
                pacing,
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                drains_started: AtomicU64::new(0),
            }),
        }
    }

    /// Append a single unit.
    pub fn enqueue(&self, unit: MessageUnit) {
        self.enqueue_batch(vec![unit]);
    }

    /// Append the units of one source event as a single delivery attempt.
    ///
    /// Starts the drain if the queue is idle. Must be called from within a
    /// Tokio runtime. Empty batches are ignored.
    pub fn enqueue_batch(&self, units: Vec<MessageUnit>) {
        if units.is_empty() {
            return;
        }
        let arm = {
            let mut state = self.inner.lock();
            state.items.push_back(units);
            !std::mem::replace(&mut state.draining, true)
        };
        if arm {
            let started = self.inner.drains_started.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(drains_started = started, "relay drain armed");
            let inner = Arc::clone(&self.inner);
            tokio::spawn(inner.drain());
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain is currently active.
    pub fn is_draining(&self) -> bool {
        self.inner.lock().draining
    }

    pub fn stats(&self) -> RelayStats {
        let (queued, draining) = {
            let state = self.inner.lock();
            (state.items.len(), state.draining)
        };
        RelayStats {
            queued,
            draining,
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            drains_started: self.inner.drains_started.load(Ordering::Relaxed),
        }
    }

    /// Resolves once no drain is active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_draining() {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let head = self.lock().items.front().cloned();
            let Some(batch) = head else {
                self.finish();
                return;
            };

            match self.deliver(&batch).await {
                DeliveryOutcome::Delivered => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(units = batch.len(), "relay batch delivered");
                },
                DeliveryOutcome::Dropped(reason) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(units = batch.len(), %reason, "relay batch dropped");
                },
            }

            tokio::time::sleep(self.pacing).await;

            let done = {
                let mut state = self.lock();
                state.items.pop_front();
                if state.items.is_empty() {
                    state.draining = false;
                    true
                } else {
                    false
                }
            };
            if done {
                self.idle.notify_waiters();
                return;
            }
        }
    }

    async fn deliver(&self, batch: &[MessageUnit]) -> DeliveryOutcome {
        match AssertUnwindSafe(self.outbound.broadcast(batch))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => DeliveryOutcome::Delivered,
            Ok(Err(e)) => DeliveryOutcome::dropped(e),
            Err(_) => DeliveryOutcome::dropped("broadcast adapter panicked"),
        }
    }

    fn finish(&self) {
        self.lock().draining = false;
        self.idle.notify_waiters();
    }
}
