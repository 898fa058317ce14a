//! Error taxonomy for the chat gateway.
//!
//! Every failure produced by the gateway core maps to one of these variants,
//! and every variant maps to exactly one HTTP-visible status code. Validation
//! failures are raised locally and never reach the completion backend; upstream
//! failures that occur after a streaming response has started are encoded as
//! in-band error frames instead (see the streaming relay).

use thiserror::Error;

/// Convenience result alias used throughout the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// The gateway error taxonomy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or missing required input field.
    #[error("{message}")]
    InvalidInput {
        /// Human-readable description of what was wrong.
        message: String,
    },

    /// Neither prompt text nor files were supplied.
    #[error("request must contain a message or at least one file")]
    EmptyRequest,

    /// The uploaded file's extension is not in the supported-type registry.
    #[error("unsupported file type: {extension}")]
    UnsupportedFileType {
        /// The offending extension, lower-cased, including the leading dot.
        extension: String,
    },

    /// The declared media type disagrees with the registry entry for the
    /// extension.
    #[error("declared media type {declared} does not match extension {extension}")]
    MimeMismatch {
        /// Extension the file was named with.
        extension: String,
        /// Media type the client declared.
        declared: String,
    },

    /// The uploaded file exceeds its size limit.
    #[error("file {name} is {size_bytes} bytes, limit is {limit_bytes}")]
    FileTooLarge {
        /// Original file name.
        name: String,
        /// Received size in bytes.
        size_bytes: u64,
        /// Effective limit in bytes (min of per-type and global).
        limit_bytes: u64,
    },

    /// The transport-level request body exceeds the configured ceiling.
    #[error("request payload too large")]
    PayloadTooLarge,

    /// The client exceeded the fixed-window rate limit.
    #[error("Too many requests from this IP, please try again later.")]
    RateLimited,

    /// The completion service failed; carries the upstream message, never an
    /// upstream stack trace.
    #[error("completion service error: {message}")]
    Completion {
        /// Message reported by the upstream service.
        message: String,
    },

    /// A blob store read or write failed.
    #[error("blob store error: {message}")]
    Blob {
        /// Description of the failed operation.
        message: String,
    },

    /// The gateway was constructed with invalid configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// What was misconfigured.
        message: String,
    },

    /// Unclassified internal error; surfaced to clients as a generic message.
    #[error("internal error")]
    Internal {
        /// Internal detail, logged but not surfaced.
        message: String,
    },
}

impl GatewayError {
    /// Create an [`GatewayError::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a [`GatewayError::Completion`] error from an upstream message.
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
        }
    }

    /// Create a [`GatewayError::Blob`] error.
    pub fn blob(message: impl Into<String>) -> Self {
        Self::Blob {
            message: message.into(),
        }
    }

    /// Create a [`GatewayError::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a [`GatewayError::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code this error surfaces as.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. }
            | Self::EmptyRequest
            | Self::UnsupportedFileType { .. }
            | Self::MimeMismatch { .. }
            | Self::FileTooLarge { .. } => 400,
            Self::PayloadTooLarge => 413,
            Self::RateLimited => 429,
            Self::Completion { .. }
            | Self::Blob { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => 500,
        }
    }

    /// Whether this is a client-side (4xx) failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
