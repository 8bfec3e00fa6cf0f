//! Error taxonomy with the flat HTTP mapping the API contract
//! requires.
//!
//! Unlike the richer RFC 7807 envelope this codebase uses elsewhere,
//! this service's error body is exactly `{"error": "<message>"}` — see
//! DESIGN.md.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced across the Coordinator boundary.
///
/// `StaleUpdate` and `QueueOverflow` are deliberately absent: they are
/// normal operation, not error conditions, and are
/// represented in-process as plain return values (see
/// [`crate::rank_index::UpsertOutcome`]) rather than as errors.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Request-level validation failure: missing query, out-of-range
    /// rating, malformed id.
    #[error("{0}")]
    InvalidInput(String),

    /// The user is unknown to the durable store.
    #[error("user not found")]
    NotFound,

    /// The durable store or its connection pool failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<sqlx::Error> for CoordinatorError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoordinatorError::NotFound,
            other => CoordinatorError::BackendUnavailable(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoordinatorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::NotFound => StatusCode::NOT_FOUND,
            CoordinatorError::BackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400() {
        let resp = CoordinatorError::InvalidInput("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let resp = CoordinatorError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn backend_unavailable_maps_to_500() {
        let resp = CoordinatorError::BackendUnavailable("down".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
