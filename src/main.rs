//! # Chat Gateway
//!
//! HTTP gateway between a chat frontend and Anthropic's Messages API.
//!
//! ## Features
//!
//! - Buffered and SSE-streamed completions
//! - Multipart file uploads assembled into multimodal user turns
//! - Conversation title generation
//! - Per-client fixed-window rate limiting
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! ANTHROPIC_API_KEY=sk-... chat-gateway
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 UPLOAD_DIR=/tmp/uploads chat-gateway
//! ```

use std::sync::Arc;

use chat_config::GatewayConfig;
use chat_files::BlobStore;
use chat_providers::AnthropicBackend;
use chat_server::{AppState, Server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application entry point
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting chat gateway"
    );

    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_env()?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.completion.default_model,
        "Configuration loaded"
    );

    let backend = Arc::new(AnthropicBackend::new(&config.completion)?);
    let blobs = Arc::new(BlobStore::new(&config.uploads.dir)?);

    spawn_stale_blob_sweeper(Arc::clone(&blobs), config.uploads.stale_blob_age);

    let state = AppState::builder()
        .config(config)
        .backend(backend)
        .blobs(blobs)
        .build()?;

    Server::new(state).run().await?;

    Ok(())
}

/// Hourly sweep of blobs orphaned by crashed or interrupted requests.
fn spawn_stale_blob_sweeper(blobs: Arc<BlobStore>, max_age: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        // First tick fires immediately, cleaning up leftovers from the
        // previous run at startup.
        loop {
            ticker.tick().await;
            let removed = blobs.cleanup_stale(max_age).await;
            if removed > 0 {
                info!(removed, "Swept stale upload blobs");
            }
        }
    });
}
