//! Request-ID stamping, access logging and CORS.

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Attach a request ID to every request: forward one supplied by the
/// caller, or generate a fresh one. Stored in request extensions for
/// [`request_logging_middleware`] and echoed back on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Log every request on entry and every response on exit, with the
/// request ID and elapsed time.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<String>()
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(request_id = %request_id, method = %method, uri = %uri, "incoming request");

    let response = next.run(request).await;

    let duration: Duration = start.elapsed();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = %duration.as_millis(),
        "request completed"
    );

    response
}

/// Permissive CORS policy: any origin, the full verb set, and a
/// 12-hour preflight cache. Credentials are deliberately left off (see
/// DESIGN.md) — browsers reject `Access-Control-Allow-Credentials`
/// paired with a wildcard origin.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderValue::from_static("origin"),
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderValue::from_static("x-request-id"),
        ])
        .expose_headers([HeaderValue::from_static("x-request-id")])
        .max_age(Duration::from_secs(12 * 3600))
}
