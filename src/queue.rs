//! Bounded write-behind queue.
//!
//! A plain bounded `tokio::sync::mpsc` channel in front of the batch
//! flusher: this queue never needs priority or durability, only
//! backpressure, so enqueue is non-blocking and drops the newest
//! update rather than stalling the caller when the channel is full.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::RatingUpdate;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Shared counters exposed for observability: HTTP requests get access
/// logging, and this covers the background pipeline.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    dropped: AtomicU64,
}

impl QueueMetrics {
    /// Number of updates dropped so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The producer half, cloned into every request-handling task.
#[derive(Clone)]
pub struct WriteBehindQueue {
    sender: mpsc::Sender<RatingUpdate>,
    metrics: Arc<QueueMetrics>,
}

impl WriteBehindQueue {
    /// Construct a bounded queue and its consumer half.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<RatingUpdate>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                sender,
                metrics: Arc::new(QueueMetrics::default()),
            },
            receiver,
        )
    }

    /// Enqueue `update` without blocking. If the queue is full the
    /// update is dropped and the overflow counter is incremented and
    /// logged at `warn`, favoring the freshest update over backpressure
    /// on the request path.
    pub fn enqueue(&self, update: RatingUpdate) {
        if let Err(err) = self.sender.try_send(update) {
            self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                user_id = update.user_id,
                dropped_total = self.metrics.dropped(),
                error = %err,
                "write-behind queue full, dropping update"
            );
        }
    }

    /// Handle to the overflow counter, shared with the queue itself.
    pub fn metrics(&self) -> Arc<QueueMetrics> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(user_id: i64, version: i64) -> RatingUpdate {
        RatingUpdate {
            user_id,
            rating: 1200,
            version,
        }
    }

    #[tokio::test]
    async fn enqueue_delivers_in_order() {
        let (queue, mut rx) = WriteBehindQueue::bounded(4);
        queue.enqueue(update(1, 1));
        queue.enqueue(update(2, 2));

        assert_eq!(rx.recv().await.unwrap().user_id, 1);
        assert_eq!(rx.recv().await.unwrap().user_id, 2);
        assert_eq!(queue.metrics().dropped(), 0);
    }

    #[tokio::test]
    async fn overflow_drops_newest_and_counts_it() {
        let (queue, mut rx) = WriteBehindQueue::bounded(1);
        queue.enqueue(update(1, 1));
        queue.enqueue(update(2, 2));

        assert_eq!(queue.metrics().dropped(), 1);
        assert_eq!(rx.recv().await.unwrap().user_id, 1);
        assert!(rx.try_recv().is_err());
    }
}
