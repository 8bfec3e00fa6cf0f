//! Router assembly.

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use super::handlers::{get_leaderboard, get_user_rank, health, search_users, update_rating, AppState};
use super::middleware::{cors_layer, request_id_middleware, request_logging_middleware};

/// Build the complete axum router for the service.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/search", get(search_users))
        .route("/api/user/:id/rank", get(get_user_rank))
        .route("/api/rating", post(update_rating))
        .layer(from_fn(request_logging_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer())
        .with_state(state)
}
