//! TCP listener and serve loop.

use axum::Router;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::shutdown::ShutdownCoordinator;

/// Bind the relay's TCP listener.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind(&config.listen_addr).await.map_err(|e| {
        ServerError::Bind(format!("Failed to bind {}: {}", config.listen_addr, e))
    })?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        max_streams = config.max_streams,
        max_body_bytes = config.max_body_bytes,
        "HTTP listener bound"
    );

    Ok(listener)
}

/// Serve `app` until shutdown is signaled.
///
/// New connections stop being accepted as soon as the coordinator fires;
/// in-flight streams observe the same signal and abort.
pub async fn serve(listener: TcpListener, app: Router, shutdown: ShutdownCoordinator) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait_for_shutdown().await })
        .await?;

    tracing::info!("Serve loop terminated");
    Ok(())
}
