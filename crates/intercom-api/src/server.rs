//! Server startup and shutdown

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, ApiState};
use crate::config::ServerConfig;
use crate::error::ServerError;

/// Bind, serve until `shutdown` resolves, then drain in-flight requests
pub async fn run<F>(config: &ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = ApiState::from_config(config)?;
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| ServerError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    info!(
        address = %listener.local_addr()?,
        poll_timeout_secs = config.signaling.poll_timeout_secs,
        "smart intercom listening"
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
