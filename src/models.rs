//! Core data model.

use serde::{Deserialize, Serialize};

/// Minimum accepted rating (inclusive).
pub const MIN_RATING: i32 = 100;
/// Maximum accepted rating (inclusive).
pub const MAX_RATING: i32 = 5000;

/// Clamp-validate a rating against `[MIN_RATING, MAX_RATING]`.
pub fn is_valid_rating(rating: i32) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

/// The canonical record for a user, as stored by the
/// [`crate::durable_store::DurableStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub rating: i32,
    pub version: i64,
}

/// An accepted rating change, stamped with the version that orders it
/// relative to any other update for the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub user_id: i64,
    pub rating: i32,
    pub version: i64,
}

/// A user as it appears in a ranked view: rank is 1-based and
/// tie-aware (competition ranking: equal ratings share a rank, and the
/// next distinct rating resumes at its absolute position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedUser {
    pub rank: i64,
    pub id: i64,
    pub username: String,
    pub rating: i32,
}
