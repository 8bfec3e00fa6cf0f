//! In-memory ranking index.
//!
//! A sorted multiset keyed on `(rating, userID)` backs ordered access;
//! a side table keyed on userID locates and removes entries in
//! O(log N). Rank itself is answered by a Fenwick tree (binary
//! indexed tree) over the fixed `[MIN_RATING, MAX_RATING]` rating
//! domain rather than by walking the ordered set, so `rank_of` stays
//! O(log R) regardless of how many users sit between a user and the
//! top — the ordered set alone would make that an O(N) scan.
//!
//! A single `parking_lot::RwLock` guards both the ordered set and the
//! side table together, so membership in one and the stored rating in
//! the other are always observed in the same state by any reader.

use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use crate::models::{RankedUser, User, MAX_RATING, MIN_RATING};

const RATING_SPAN: usize = (MAX_RATING - MIN_RATING + 1) as usize;

fn rating_index(rating: i32) -> usize {
    debug_assert!((MIN_RATING..=MAX_RATING).contains(&rating));
    (rating - MIN_RATING + 1) as usize
}

fn fenwick_add(tree: &mut [i64], mut i: usize, delta: i64) {
    let len = tree.len();
    while i < len {
        tree[i] += delta;
        i += i & i.wrapping_neg();
    }
}

fn fenwick_prefix_sum(tree: &[i64], mut i: usize) -> i64 {
    let mut sum = 0i64;
    while i > 0 {
        sum += tree[i];
        i -= i & i.wrapping_neg();
    }
    sum
}

#[derive(Debug, Clone)]
struct Entry {
    rating: i32,
    version: i64,
    username: String,
}

/// Outcome of an [`RankIndex::upsert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The update's version was strictly greater than any stored
    /// version for this user; it was applied.
    Applied,
    /// A version at least as large was already stored; the update
    /// was ignored.
    Stale,
}

struct Inner {
    ordered: BTreeSet<(Reverse<i32>, i64)>,
    by_id: HashMap<i64, Entry>,
    rating_counts: Vec<i64>,
}

impl Inner {
    fn empty() -> Self {
        Self {
            ordered: BTreeSet::new(),
            by_id: HashMap::new(),
            rating_counts: vec![0i64; RATING_SPAN + 1],
        }
    }
}

/// Concurrent-safe mapping from userID to `(rating, version, username)`
/// with ordered access by rating.
///
/// Every mutation and every read acquires the same lock, so the
/// ordered view and the side table are always observed in a
/// consistent state by any single operation.
pub struct RankIndex {
    inner: RwLock<Inner>,
}

impl Default for RankIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RankIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::empty()),
        }
    }

    /// Apply a rating update iff `version` is strictly greater than
    /// any version already stored for `user_id`.
    pub fn upsert(&self, user_id: i64, rating: i32, version: i64) -> UpsertOutcome {
        let mut inner = self.inner.write();

        if let Some(existing) = inner.by_id.get(&user_id) {
            if version <= existing.version {
                return UpsertOutcome::Stale;
            }
        }

        let username = inner
            .by_id
            .get(&user_id)
            .map(|e| e.username.clone())
            .unwrap_or_default();

        if let Some(old) = inner.by_id.remove(&user_id) {
            inner.ordered.remove(&(Reverse(old.rating), user_id));
            fenwick_add(&mut inner.rating_counts, rating_index(old.rating), -1);
        }

        inner.ordered.insert((Reverse(rating), user_id));
        fenwick_add(&mut inner.rating_counts, rating_index(rating), 1);
        inner.by_id.insert(
            user_id,
            Entry {
                rating,
                version,
                username,
            },
        );

        UpsertOutcome::Applied
    }

    /// Replace the entire index contents with `users`, atomically with
    /// respect to every other operation. Used exclusively by warm-up.
    pub fn bulk_load(&self, users: impl IntoIterator<Item = User>) {
        let mut fresh = Inner::empty();
        for user in users {
            fresh.ordered.insert((Reverse(user.rating), user.id));
            fenwick_add(&mut fresh.rating_counts, rating_index(user.rating), 1);
            fresh.by_id.insert(
                user.id,
                Entry {
                    rating: user.rating,
                    version: user.version,
                    username: user.username,
                },
            );
        }
        *self.inner.write() = fresh;
    }

    /// Up to `limit` entries starting at zero-based `offset`, in
    /// descending rating order, with tie-aware competition ranking.
    /// Empty if `offset` is past the end.
    pub fn range_descending(&self, offset: usize, limit: usize) -> Vec<RankedUser> {
        let inner = self.inner.read();
        let mut out = Vec::with_capacity(limit.min(inner.ordered.len().saturating_sub(offset)));
        let mut prev_rating: Option<i32> = None;
        let mut rank = offset as i64 + 1;

        for (index, (Reverse(rating), user_id)) in
            inner.ordered.iter().enumerate().skip(offset).take(limit)
        {
            if prev_rating != Some(*rating) {
                rank = index as i64 + 1;
                prev_rating = Some(*rating);
            }
            let entry = inner
                .by_id
                .get(user_id)
                .expect("ordered set and side table must stay in sync");
            out.push(RankedUser {
                rank,
                id: *user_id,
                username: entry.username.clone(),
                rating: *rating,
            });
        }

        out
    }

    /// `1 + |{v : rating(v) > rating(userID)}|`, or `None` if unknown.
    pub fn rank_of(&self, user_id: i64) -> Option<(i64, i32)> {
        let inner = self.inner.read();
        let entry = inner.by_id.get(&user_id)?;
        let total = fenwick_prefix_sum(&inner.rating_counts, RATING_SPAN);
        let not_greater = fenwick_prefix_sum(&inner.rating_counts, rating_index(entry.rating));
        let rank = total - not_greater + 1;
        Some((rank, entry.rating))
    }

    /// Total number of users currently tracked.
    pub fn count(&self) -> usize {
        self.inner.read().by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, username: &str, rating: i32, version: i64) -> User {
        User {
            id,
            username: username.to_string(),
            rating,
            version,
        }
    }

    #[test]
    fn tie_ranking_matches_competition_rules() {
        let index = RankIndex::new();
        index.bulk_load(vec![
            user(1, "a", 1500, 1),
            user(2, "b", 1500, 1),
            user(3, "c", 1400, 1),
            user(4, "d", 1300, 1),
        ]);

        let ranks: Vec<(i64, i64)> = index
            .range_descending(0, 10)
            .into_iter()
            .map(|u| (u.id, u.rank))
            .collect();

        assert_eq!(ranks, vec![(1, 1), (2, 1), (3, 3), (4, 4)]);

        assert_eq!(index.rank_of(1), Some((1, 1500)));
        assert_eq!(index.rank_of(2), Some((1, 1500)));
        assert_eq!(index.rank_of(3), Some((3, 1400)));
        assert_eq!(index.rank_of(4), Some((4, 1300)));
    }

    #[test]
    fn upsert_rejects_stale_and_equal_versions() {
        let index = RankIndex::new();
        assert_eq!(index.upsert(1, 1200, 5), UpsertOutcome::Applied);
        assert_eq!(index.upsert(1, 1300, 5), UpsertOutcome::Stale);
        assert_eq!(index.upsert(1, 1300, 4), UpsertOutcome::Stale);
        assert_eq!(index.rank_of(1), Some((1, 1200)));

        assert_eq!(index.upsert(1, 1300, 6), UpsertOutcome::Applied);
        assert_eq!(index.rank_of(1), Some((1, 1300)));
    }

    #[test]
    fn upsert_preserves_username_across_rating_changes() {
        let index = RankIndex::new();
        index.bulk_load(vec![user(1, "alice", 1000, 0)]);
        index.upsert(1, 1100, 1);

        let page = index.range_descending(0, 1);
        assert_eq!(page[0].username, "alice");
    }

    #[test]
    fn offset_past_end_is_empty() {
        let index = RankIndex::new();
        index.bulk_load(vec![user(1, "a", 1000, 0)]);
        assert!(index.range_descending(5, 10).is_empty());
    }

    #[test]
    fn pagination_is_coverage_complete_when_quiescent() {
        let index = RankIndex::new();
        index.bulk_load(
            (0..37)
                .map(|i| user(i, &format!("u{i}"), MIN_RATING + i as i32, 0))
                .collect::<Vec<_>>(),
        );

        let whole = index.range_descending(0, 37);
        let mut split = index.range_descending(0, 20);
        split.extend(index.range_descending(20, 17));

        assert_eq!(whole, split);
    }

    #[test]
    fn rank_of_missing_user_is_none() {
        let index = RankIndex::new();
        assert_eq!(index.rank_of(42), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn ratings() -> impl Strategy<Value = i32> {
        MIN_RATING..=MAX_RATING
    }

    proptest! {
        #[test]
        fn rank_definition_holds(ratings in prop::collection::vec(ratings(), 1..50)) {
            let index = RankIndex::new();
            let users: Vec<User> = ratings
                .iter()
                .enumerate()
                .map(|(i, &r)| User { id: i as i64, username: format!("u{i}"), rating: r, version: 0 })
                .collect();
            index.bulk_load(users.clone());

            for u in &users {
                let expected = 1 + users.iter().filter(|v| v.rating > u.rating).count() as i64;
                let (rank, _) = index.rank_of(u.id).unwrap();
                prop_assert_eq!(rank, expected);
            }
        }

        #[test]
        fn tie_aware_ordering_holds(ratings in prop::collection::vec(ratings(), 2..50)) {
            let index = RankIndex::new();
            let users: Vec<User> = ratings
                .iter()
                .enumerate()
                .map(|(i, &r)| User { id: i as i64, username: format!("u{i}"), rating: r, version: 0 })
                .collect();
            index.bulk_load(users.clone());

            for a in &users {
                for b in &users {
                    let (rank_a, _) = index.rank_of(a.id).unwrap();
                    let (rank_b, _) = index.rank_of(b.id).unwrap();
                    if a.rating > b.rating {
                        prop_assert!(rank_a < rank_b);
                    } else if a.rating == b.rating {
                        prop_assert_eq!(rank_a, rank_b);
                    }
                }
            }
        }
    }
}
