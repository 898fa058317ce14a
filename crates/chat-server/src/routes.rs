//! Router assembly.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

/// Builds the gateway router.
///
/// All `/api` routes sit behind the shared rate limiter; the health probe
/// does not.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/chat", post(handlers::send_message))
        .route("/chat/stream", post(handlers::stream_message))
        .route("/chat/upload", post(handlers::upload_and_complete))
        .route("/chat/title", post(handlers::generate_title))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
