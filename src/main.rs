//! Service entry point.
//!
//! Startup sequence: load config, connect the durable store, probe
//! the ranking-store endpoint for reachability, warm the fast index,
//! spawn the batch flusher, then serve HTTP until a shutdown signal
//! arrives — at which point the flusher gets one final, uncancelled
//! drain before the process exits.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;

use leaderboard::api::handlers::AppState;
use leaderboard::config::Config;
use leaderboard::coordinator::Coordinator;
use leaderboard::durable_store::PostgresStore;
use leaderboard::flusher::BatchFlusher;
use leaderboard::queue::WriteBehindQueue;
use leaderboard::rank_index::RankIndex;

#[tokio::main]
async fn main() -> ExitCode {
    leaderboard::telemetry::init();

    let config = Config::from_env();

    let store = match PostgresStore::connect(&config.database_url).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to durable store");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = check_rank_store_reachable(&config.redis_url()).await {
        tracing::error!(error = %err, "rank store unreachable");
        return ExitCode::FAILURE;
    }

    let rank_index = Arc::new(RankIndex::new());
    let (queue, receiver) = WriteBehindQueue::bounded(leaderboard::queue::DEFAULT_CAPACITY);
    let coordinator = Coordinator::new(rank_index, queue, store.clone());

    if let Err(err) = coordinator.warm_up().await {
        tracing::error!(error = %err, "cache warm-up failed");
        return ExitCode::FAILURE;
    }
    tracing::info!("cache warm-up complete");

    let shutdown = CancellationToken::new();
    let flusher = BatchFlusher::new(store);
    let flusher_shutdown = shutdown.clone();
    let flusher_handle = tokio::spawn(flusher.run(receiver, flusher_shutdown));

    let state = Arc::new(AppState { coordinator });
    let app = leaderboard::api::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, addr = %addr, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(addr = %addr, "listening");

    let serve_shutdown = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            serve_shutdown.cancel();
        })
        .await;

    if let Err(err) = result {
        tracing::error!(error = %err, "server error");
    }

    shutdown.cancel();
    if let Err(err) = flusher_handle.await {
        tracing::error!(error = %err, "batch flusher task panicked");
    }
    tracing::info!("shutdown complete");

    ExitCode::SUCCESS
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

async fn check_rank_store_reachable(redis_url: &str) -> Result<(), redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    let mut conn = redis::aio::ConnectionManager::new(client).await?;
    let _: () = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
}
