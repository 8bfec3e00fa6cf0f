//! Response bodies: flat, purpose-built JSON shapes, one struct per
//! endpoint.

use serde::Serialize;

use crate::coordinator::SearchResult;
use crate::models::RankedUser;

/// Body of `GET /api/leaderboard`.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub users: Vec<RankedUser>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Body of `GET /api/search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<SearchResult>,
    pub count: usize,
}

/// Body of `GET /api/user/:id/rank`.
#[derive(Debug, Serialize)]
pub struct UserRankResponse {
    #[serde(flatten)]
    pub user: SearchResult,
}

/// Body of `POST /api/rating` — fixed `{"status": "updated"}`. A
/// stale-by-version update still reports success; it is not an error.
#[derive(Debug, Serialize)]
pub struct UpdateRatingResponse {
    pub status: &'static str,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
