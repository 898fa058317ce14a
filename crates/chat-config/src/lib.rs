//! # Chat Config
//!
//! Configuration management for the chat gateway.
//!
//! Configuration is built explicitly with [`GatewayConfig::from_env`], which
//! returns a result instead of exiting the process; the hosting entry point
//! decides whether a configuration failure is fatal at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::env;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Errors raised while constructing the gateway configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The completion service API key is not configured.
    #[error("ANTHROPIC_API_KEY is required; add it to the environment")]
    MissingApiKey,

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {message}")]
    InvalidValue {
        /// Environment variable name.
        var: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Completion service settings.
    pub completion: CompletionConfig,
    /// Upload and blob store settings.
    pub uploads: UploadConfig,
    /// Fixed-window rate limit settings.
    pub rate_limit: RateLimitConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Transport-level request body ceiling in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            body_limit_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Completion service settings.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// API key for the hosted completion service.
    pub api_key: SecretString,
    /// Base URL of the completion service API.
    pub base_url: String,
    /// Fallback model when the caller omits one.
    pub default_model: String,
    /// Token generation ceiling.
    pub max_tokens: u32,
    /// Temperature applied when the caller's value is missing or unusable.
    pub default_temperature: f32,
    /// Request timeout for completion calls.
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new(String::new()),
            base_url: "https://api.anthropic.com".to_string(),
            default_model: "claude-3-opus-20240229".to_string(),
            max_tokens: 4096,
            default_temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Upload and blob store settings.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory backing the temporary blob store.
    pub dir: String,
    /// Global per-file size ceiling in bytes.
    pub max_file_size_bytes: u64,
    /// Maximum file parts accepted per request.
    pub max_files: usize,
    /// Age after which orphaned blobs are swept.
    pub stale_blob_age: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            max_file_size_bytes: 25 * 1024 * 1024,
            max_files: 10,
            stale_blob_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length.
    pub window: Duration,
    /// Admitted requests per client key per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            completion: CompletionConfig::default(),
            uploads: UploadConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from the environment.
    ///
    /// Recognized variables: `ANTHROPIC_API_KEY` (required),
    /// `ANTHROPIC_BASE_URL`, `GATEWAY_HOST`, `GATEWAY_PORT`,
    /// `GATEWAY_DEFAULT_MODEL`, `UPLOAD_DIR`.
    ///
    /// # Errors
    /// [`ConfigError::MissingApiKey`] when the API key is absent or empty;
    /// [`ConfigError::InvalidValue`] when an override fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::default();
        config.completion.api_key = SecretString::new(api_key);

        if let Ok(base_url) = env::var("ANTHROPIC_BASE_URL") {
            config.completion.base_url = base_url;
        }
        if let Ok(model) = env::var("GATEWAY_DEFAULT_MODEL") {
            config.completion.default_model = model;
        }
        if let Ok(host) = env::var("GATEWAY_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("GATEWAY_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                var: "GATEWAY_PORT".to_string(),
                message: format!("expected a port number, got {port:?}"),
            })?;
        }
        if let Ok(dir) = env::var("UPLOAD_DIR") {
            config.uploads.dir = dir;
        }

        Ok(config)
    }
}
