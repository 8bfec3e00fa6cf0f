//! HTTP transport: the four leaderboard operations plus `/health`,
//! exposed over axum.

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;

pub use routes::build_router;
