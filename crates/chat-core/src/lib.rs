//! # Chat Core
//!
//! Core types, traits, and error handling for the chat gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Conversation turns and typed content blocks
//! - The completion backend trait and normalized request/result types
//! - The cancellable completion event stream
//! - The gateway error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod request;
pub mod response;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use backend::CompletionBackend;
pub use error::{GatewayError, GatewayResult};
pub use request::{ChatTurn, CompletionRequest, ContentBlock, ImageSource, TurnContent, TurnRole};
pub use response::Completion;
pub use streaming::{CompletionStream, StreamEvent};
pub use types::{MaxTokens, Temperature};
