//! Coordinator: the four request-facing operations, wired over
//! [`crate::rank_index::RankIndex`], [`crate::queue::WriteBehindQueue`]
//! and [`crate::durable_store::DurableStore`].
//!
//! `GetLeaderboard` reads purely from the fast index; `SearchUsers`
//! searches the durable store then joins each match back to the fast
//! index for its live rank, falling back to the durable rating with
//! rank zero if the index doesn't know the user yet; `UpdateRating`
//! applies to the fast index first and enqueues the durable write
//! second, never the reverse.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::durable_store::DurableStore;
use crate::error::CoordinatorError;
use crate::models::{is_valid_rating, RankedUser, RatingUpdate};
use crate::queue::WriteBehindQueue;
use crate::rank_index::{RankIndex, UpsertOutcome};

/// A user as returned by search, where rank may be a live value from
/// the fast index or a documented fallback when the index hasn't
/// caught up yet.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResult {
    pub id: i64,
    pub username: String,
    pub rating: i32,
    pub rank: i64,
}

/// Ties the fast index, the write-behind queue and the durable store
/// into the four operations the HTTP layer exposes.
pub struct Coordinator {
    rank_index: Arc<RankIndex>,
    queue: WriteBehindQueue,
    store: Arc<dyn DurableStore>,
    version_clock: AtomicI64,
}

impl Coordinator {
    pub fn new(rank_index: Arc<RankIndex>, queue: WriteBehindQueue, store: Arc<dyn DurableStore>) -> Self {
        Self {
            rank_index,
            queue,
            store,
            version_clock: AtomicI64::new(0),
        }
    }

    /// Load every user from the durable store into the fast index.
    /// Run once at startup before the HTTP listener is bound.
    pub async fn warm_up(&self) -> Result<(), CoordinatorError> {
        let users = self.store.load_all().await?;
        let max_version = users.iter().map(|u| u.version).max().unwrap_or(0);
        self.rank_index.bulk_load(users);
        self.version_clock.fetch_max(max_version, Ordering::SeqCst);
        Ok(())
    }

    /// Paginated, rank-ordered view straight from the fast index.
    pub fn get_leaderboard(&self, offset: usize, limit: usize) -> Vec<RankedUser> {
        self.rank_index.range_descending(offset, limit)
    }

    /// Total number of users currently tracked by the fast index, used
    /// as the leaderboard response's `total` field — distinct from the
    /// length of any one page.
    pub fn total_users(&self) -> usize {
        self.rank_index.count()
    }

    /// Username search against the durable store, with rank joined in
    /// from the fast index where available.
    pub async fn search_users(&self, query: &str) -> Result<Vec<SearchResult>, CoordinatorError> {
        if query.trim().is_empty() {
            return Err(CoordinatorError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }
        let matches = self.store.search_by_username(query).await?;
        Ok(matches
            .into_iter()
            .map(|user| match self.rank_index.rank_of(user.id) {
                Some((rank, rating)) => SearchResult {
                    id: user.id,
                    username: user.username,
                    rating,
                    rank,
                },
                None => SearchResult {
                    id: user.id,
                    username: user.username,
                    rating: user.rating,
                    rank: 0,
                },
            })
            .collect())
    }

    /// A single user's live rank, falling back to the durable record
    /// (rank zero) if the fast index hasn't seen this user yet.
    pub async fn get_user_rank(&self, user_id: i64) -> Result<SearchResult, CoordinatorError> {
        if let Some((rank, rating)) = self.rank_index.rank_of(user_id) {
            let username = self.store.get_by_id(user_id).await?.username;
            return Ok(SearchResult {
                id: user_id,
                username,
                rating,
                rank,
            });
        }
        let user = self.store.get_by_id(user_id).await?;
        Ok(SearchResult {
            id: user.id,
            username: user.username,
            rating: user.rating,
            rank: 0,
        })
    }

    /// Apply a rating change: validate, stamp a monotonic version,
    /// update the fast index synchronously, then enqueue the durable
    /// write. A stale update (by version) is a normal, successful
    /// outcome, not an error — the fast index is updated first and is
    /// never blocked on a durable-store round trip.
    pub async fn update_rating(
        &self,
        user_id: i64,
        rating: i32,
    ) -> Result<UpsertOutcome, CoordinatorError> {
        if !is_valid_rating(rating) {
            return Err(CoordinatorError::InvalidInput(format!(
                "rating must be between 100 and 5000, got {rating}"
            )));
        }

        let version = self.version_clock.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.rank_index.upsert(user_id, rating, version);

        self.queue.enqueue(RatingUpdate {
            user_id,
            rating,
            version,
        });

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable_store::fake::FakeDurableStore;
    use crate::queue::WriteBehindQueue;

    async fn coordinator_with_seed() -> (Coordinator, Arc<FakeDurableStore>) {
        let store = Arc::new(FakeDurableStore::new());
        store.create_user("alice", 1000).await.unwrap();
        store.create_user("bob", 1200).await.unwrap();

        let rank_index = Arc::new(RankIndex::new());
        let (queue, _rx) = WriteBehindQueue::bounded(16);
        let coordinator = Coordinator::new(rank_index, queue, store.clone());
        coordinator.warm_up().await.unwrap();
        (coordinator, store)
    }

    #[tokio::test]
    async fn leaderboard_reflects_warm_up() {
        let (coordinator, _store) = coordinator_with_seed().await;
        let page = coordinator.get_leaderboard(0, 10);
        assert_eq!(page[0].username, "bob");
        assert_eq!(page[1].username, "alice");
    }

    #[tokio::test]
    async fn update_rating_rejects_out_of_range() {
        let (coordinator, _store) = coordinator_with_seed().await;
        let err = coordinator.update_rating(1, 50).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_rating_applies_straight_to_the_fast_index_for_unknown_user() {
        let (coordinator, _store) = coordinator_with_seed().await;
        let outcome = coordinator.update_rating(999, 1500).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Applied);
        assert_eq!(coordinator.rank_index.rank_of(999), Some((1, 1500)));
    }

    #[tokio::test]
    async fn update_rating_moves_user_in_leaderboard() {
        let (coordinator, _store) = coordinator_with_seed().await;
        coordinator.update_rating(1, 5000).await.unwrap();

        let page = coordinator.get_leaderboard(0, 10);
        assert_eq!(page[0].username, "alice");
        assert_eq!(page[0].rank, 1);
    }

    #[tokio::test]
    async fn search_falls_back_to_durable_rating_for_unknown_index_entry() {
        let store = Arc::new(FakeDurableStore::new());
        store.create_user("carol", 1400).await.unwrap();

        let rank_index = Arc::new(RankIndex::new());
        let (queue, _rx) = WriteBehindQueue::bounded(16);
        let coordinator = Coordinator::new(rank_index, queue, store.clone());

        let results = coordinator.search_users("car").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[0].rating, 1400);
    }
}
