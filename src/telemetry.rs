//! Structured logging setup.
//!
//! A thin wrapper around `tracing_subscriber::fmt`, driven by
//! `RUST_LOG`.

/// Install the global tracing subscriber. Call once, at the very
/// start of `main`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("leaderboard=info,tower_http=info")
            }),
        )
        .with_target(true)
        .init();
}
