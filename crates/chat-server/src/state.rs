//! Shared application state.

use chat_config::GatewayConfig;
use chat_core::{CompletionBackend, GatewayError};
use chat_files::BlobStore;
use std::sync::Arc;

use crate::rate_limit::RateLimiter;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Completion service adapter.
    pub backend: Arc<dyn CompletionBackend>,
    /// Durable storage for uploaded blobs.
    pub blobs: Arc<BlobStore>,
    /// Shared request limiter.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Starts building application state.
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend.id())
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AppState`].
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    backend: Option<Arc<dyn CompletionBackend>>,
    blobs: Option<Arc<BlobStore>>,
    limiter: Option<Arc<RateLimiter>>,
}

impl AppStateBuilder {
    /// Sets the gateway configuration.
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the completion backend.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the blob store.
    #[must_use]
    pub fn blobs(mut self, blobs: Arc<BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Overrides the rate limiter. Defaults to one built from the config.
    #[must_use]
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Assembles the state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or blob store is missing.
    pub fn build(self) -> Result<AppState, GatewayError> {
        let config = self.config.unwrap_or_default();
        let backend = self
            .backend
            .ok_or_else(|| GatewayError::configuration("no completion backend configured"))?;
        let blobs = self
            .blobs
            .ok_or_else(|| GatewayError::configuration("no blob store configured"))?;
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        Ok(AppState {
            config: Arc::new(config),
            backend,
            blobs,
            limiter,
        })
    }
}
