mod config;
mod handlers;
mod patterns;
mod responses;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use handlers::AppState;
use responses::ResponseChunks;

fn main() -> std::io::Result<()> {
    let config = Config::parse();

    let filter = if config.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;

    runtime.block_on(run_server(config))
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/:area/:action", post(handlers::generate))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/stats/reset", post(handlers::stats_reset))
        .with_state(state)
}

async fn run_server(config: Config) -> std::io::Result<()> {
    let chunks = ResponseChunks::new(config.chunk_count);

    info!(
        "Pre-computed {} content events, {}ms delay between events",
        chunks.len(),
        config.chunk_delay_ms
    );

    let state = Arc::new(AppState {
        chunks,
        chunk_delay: Duration::from_millis(config.chunk_delay_ms),
    });

    let listener = TcpListener::bind(&config.listen).await?;

    info!(
        "Mock generation API listening on {} ({} workers, HTTP/1.1 and h2c)",
        config.listen,
        config.worker_threads()
    );

    axum::serve(listener, router(state)).await
}
