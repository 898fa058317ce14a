//! Completion result types.

use serde::{Deserialize, Serialize};

/// A single (non-streaming) completion result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// First textual payload of the response.
    pub text: String,
    /// Model that produced the response.
    pub model: String,
}

impl Completion {
    /// Create a completion result.
    #[must_use]
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }
}
