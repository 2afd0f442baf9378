//! SSE re-streaming relay.
//!
//! Accepts generation requests from the web frontend, forwards them to the
//! generation backend and streams the generated text back.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! stream-relay-rs config/relay.toml
//!
//! # With environment variables
//! BACKEND_URL=http://10.0.0.5:8000 RELAY_AUTH_TOKENS=dev-token stream-relay-rs
//!
//! # Mock backend for local runs
//! RELAY_BACKEND_PROVIDER=mock stream-relay-rs
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stream_relay_rs::{
    auth::StaticTokenAuthenticator,
    backend::create_backend,
    config::{Config, LoggingConfig},
    metrics::{init_metrics, start_metrics_server},
    server::{self, AppState},
    shutdown::ShutdownCoordinator,
};

/// SSE re-streaming relay for generation backends.
#[derive(Parser, Debug)]
#[command(name = "stream-relay-rs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override listen address.
    #[arg(short, long)]
    listen: Option<String>,

    /// Override generation backend base URL.
    #[arg(long)]
    backend_url: Option<String>,

    /// Override backend provider (http, mock).
    #[arg(short, long)]
    backend: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_ref())?;

    // CLI overrides win over file and environment
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(url) = args.backend_url {
        config.upstream.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(backend) = args.backend {
        config.upstream.provider = backend;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    init_logging(&config.logging)?;

    tracing::info!(
        listen_addr = %config.server.listen_addr,
        backend = %config.upstream.provider,
        base_url = %config.upstream.base_url,
        max_streams = config.server.max_streams,
        "Starting stream relay"
    );

    init_metrics();

    if config.metrics.enabled {
        let addr = config.metrics.listen_addr.parse()?;
        start_metrics_server(addr)?;
    }

    let backend = create_backend(&config.upstream)?;
    tracing::info!(backend = backend.name(), "Backend initialized");

    let shutdown = ShutdownCoordinator::new();

    let state = AppState {
        backend,
        auth: Arc::new(StaticTokenAuthenticator::from_config(&config.auth)),
        shutdown: shutdown.clone(),
        max_streams: config.server.max_streams,
    };
    let app = server::router(state, config.server.max_body_bytes);

    let listener = server::bind(&config.server).await?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = handle_signals(signal_shutdown).await {
            tracing::error!(error = %e, "Failed to install signal handlers");
        }
    });

    let mut serve_task = tokio::spawn(server::serve(listener, app, shutdown.clone()));

    tokio::select! {
        _ = shutdown.wait_for_shutdown() => {}
        result = &mut serve_task => {
            // Serve loop ended on its own; nothing left to drain into.
            shutdown.shutdown();
            result??;
            return Ok(());
        }
    }

    tracing::info!(
        active = shutdown.active_streams(),
        timeout_secs = config.server.shutdown_timeout_secs,
        "Waiting for streams to drain"
    );

    let drain = async {
        shutdown.wait_for_drain().await;
        serve_task.await
    };

    match tokio::time::timeout(config.server.shutdown_timeout(), drain).await {
        Ok(Ok(Ok(()))) => tracing::info!("All streams drained"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Serve task failed"),
        Err(_) => tracing::warn!(
            active = shutdown.active_streams(),
            "Shutdown timeout reached, forcing exit"
        ),
    }

    tracing::info!("Relay stopped");
    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }

    Ok(())
}

/// Handle Unix signals.
async fn handle_signals(shutdown: ShutdownCoordinator) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating shutdown");
                shutdown.shutdown();
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating shutdown");
                shutdown.shutdown();
                break;
            }
            _ = sighup.recv() => {
                tracing::info!(
                    active_streams = shutdown.active_streams(),
                    "Received SIGHUP, status report"
                );
            }
        }
    }

    Ok(())
}
