//! # Chat Server
//!
//! HTTP server implementation for the chat gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server with the four chat endpoints
//! - Fixed-window rate limiting ahead of every endpoint
//! - Multipart upload handling with unconditional blob cleanup
//! - The streaming relay forwarding completion events as an SSE response
//! - Error mapping from the gateway taxonomy to HTTP responses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod rate_limit;
pub mod relay;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use relay::{RelayState, StreamRelay};
pub use routes::create_router;
pub use server::Server;
pub use state::AppState;
