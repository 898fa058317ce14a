//! HTTP server lifecycle.

use std::net::SocketAddr;

use chat_core::GatewayError;
use tracing::info;

use crate::routes::create_router;
use crate::state::AppState;

/// The gateway HTTP server.
#[derive(Debug)]
pub struct Server {
    state: AppState,
}

impl Server {
    /// Creates a server around assembled application state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Binds and serves until ctrl-c.
    ///
    /// # Errors
    /// Returns an error when the listener cannot bind or the server fails.
    pub async fn run(self) -> Result<(), GatewayError> {
        let addr = format!(
            "{}:{}",
            self.state.config.server.host, self.state.config.server.port
        );

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::internal(format!("failed to bind {addr}: {e}")))?;

        info!(%addr, "Gateway listening");

        let router = create_router(self.state);
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::internal(format!("server error: {e}")))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
