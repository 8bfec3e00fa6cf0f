//! Request handlers for the four leaderboard operations plus
//! `/health`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;

use super::responses::{
    HealthResponse, LeaderboardResponse, SearchResponse, UpdateRatingResponse, UserRankResponse,
};

/// Shared application state, handed to every handler.
pub struct AppState {
    pub coordinator: Coordinator,
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Clamp a requested limit: non-positive values default to 50, values
/// above 100 cap to 100.
fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_LIMIT as usize,
        Some(l) if l <= 0 => DEFAULT_LIMIT as usize,
        Some(l) => l.min(MAX_LIMIT) as usize,
    }
}

fn clamp_offset(offset: Option<i64>) -> usize {
    offset.unwrap_or(0).max(0) as usize
}

pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let offset = clamp_offset(params.offset);
    let limit = clamp_limit(params.limit);

    let users = state.coordinator.get_leaderboard(offset, limit);
    let total = state.coordinator.total_users();
    Json(LeaderboardResponse {
        users,
        total,
        limit,
        offset,
    })
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, CoordinatorError> {
    let query = params
        .q
        .ok_or_else(|| CoordinatorError::InvalidInput("missing query parameter 'q'".to_string()))?;

    let users = state.coordinator.search_users(&query).await?;
    let count = users.len();
    Ok(Json(SearchResponse { users, count }))
}

pub async fn get_user_rank(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, CoordinatorError> {
    let user = state.coordinator.get_user_rank(user_id).await?;
    Ok(Json(UserRankResponse { user }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub user_id: i64,
    pub rating: i32,
}

pub async fn update_rating(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateRatingRequest>,
) -> Result<impl IntoResponse, CoordinatorError> {
    // A stale outcome is not an error: the caller still sees success,
    // the newer update simply won the race.
    state
        .coordinator
        .update_rating(body.user_id, body.rating)
        .await?;

    Ok(Json(UpdateRatingResponse { status: "updated" }))
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}
