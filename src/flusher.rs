//! Size/time-bounded batch flushing.
//!
//! A single `tokio::select!` loop collects updates into a batch,
//! flushing eagerly once the batch hits its size threshold and
//! otherwise on a fixed tick, then drains whatever remains
//! unconditionally on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::durable_store::DurableStore;
use crate::models::RatingUpdate;

/// Default number of updates collected before an eager flush.
pub const DEFAULT_BATCH_SIZE: usize = 500;
/// Default time-bound between flushes of a partial batch.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(250);

/// Drains the write-behind queue into the durable store in batches.
pub struct BatchFlusher {
    store: Arc<dyn DurableStore>,
    batch_size: usize,
    flush_interval: Duration,
}

impl BatchFlusher {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Run the collect/flush loop until `shutdown` is cancelled, then
    /// perform one final, uncancellable drain of whatever is left in
    /// `receiver` before returning.
    pub async fn run(
        self,
        mut receiver: mpsc::Receiver<RatingUpdate>,
        shutdown: CancellationToken,
    ) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    break;
                }

                maybe_update = receiver.recv() => {
                    match maybe_update {
                        Some(update) => {
                            batch.push(update);
                            if batch.len() >= self.batch_size {
                                self.flush(&mut batch).await;
                            }
                        }
                        None => break,
                    }
                }

                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.flush(&mut batch).await;
                    }
                }
            }
        }

        // Final drain: collect whatever is still buffered in the
        // channel without waiting on new sends, then flush it.
        while let Ok(update) = receiver.try_recv() {
            batch.push(update);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch).await;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }
    }

    async fn flush(&self, batch: &mut Vec<RatingUpdate>) {
        if let Err(err) = self.store.batch_apply(batch).await {
            tracing::error!(batch_len = batch.len(), error = %err, "batch flush failed, discarding batch");
        }
        batch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable_store::fake::FakeDurableStore;

    #[tokio::test]
    async fn flushes_on_size_threshold() {
        let store = Arc::new(FakeDurableStore::new());
        store.create_user("alice", 1000).await.unwrap();

        let flusher = BatchFlusher::new(store.clone()).with_batch_size(2);
        let (tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        tx.send(RatingUpdate { user_id: 1, rating: 1100, version: 1 })
            .await
            .unwrap();
        tx.send(RatingUpdate { user_id: 1, rating: 1200, version: 2 })
            .await
            .unwrap();

        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(flusher.run(rx, shutdown_clone));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        drop(tx);
        handle.await.unwrap();

        let user = store.get_by_id(1).await.unwrap();
        assert_eq!(user.rating, 1200);
        assert_eq!(user.version, 2);
    }

    #[tokio::test]
    async fn final_drain_applies_remaining_updates_on_shutdown() {
        let store = Arc::new(FakeDurableStore::new());
        store.create_user("bob", 1000).await.unwrap();

        let flusher = BatchFlusher::new(store.clone()).with_batch_size(500);
        let (tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        tx.send(RatingUpdate { user_id: 1, rating: 1500, version: 1 })
            .await
            .unwrap();

        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(flusher.run(rx, shutdown_clone));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let user = store.get_by_id(1).await.unwrap();
        assert_eq!(user.rating, 1500);
    }
}
