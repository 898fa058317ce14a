//! # Chat Providers
//!
//! Completion service client adapters for the chat gateway.
//!
//! One adapter is currently implemented: Anthropic's Messages API. Adapters
//! normalize provider errors into the gateway taxonomy and expose upstream
//! streams through the gateway's cancellable [`chat_core::CompletionStream`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;

// Re-export main types
pub use anthropic::AnthropicBackend;
