//! HTTP-facing error type.
//!
//! Every [`GatewayError`] maps to exactly one status code and a JSON body of
//! the shape `{"error": {"message": ..., "type": ...}}`. Internal errors are
//! logged with full detail but surface only a generic message; upstream stack
//! traces never leave the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chat_core::GatewayError;
use serde_json::json;
use tracing::error;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status to respond with.
    pub status: StatusCode,
    /// Message placed in the response body.
    pub message: String,
    /// Machine-readable error class.
    pub error_type: &'static str,
}

impl ApiError {
    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            error_type: "invalid_request_error",
        }
    }

    /// 413 Payload Too Large.
    #[must_use]
    pub fn payload_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "The request payload is too large. Please reduce the size.".to_string(),
            error_type: "payload_too_large",
        }
    }

    /// 500 Internal Server Error with a generic message.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong".to_string(),
            error_type: "api_error",
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_type = match &err {
            GatewayError::RateLimited => "rate_limit_error",
            GatewayError::PayloadTooLarge => "payload_too_large",
            GatewayError::Completion { .. }
            | GatewayError::Blob { .. }
            | GatewayError::Configuration { .. }
            | GatewayError::Internal { .. } => "api_error",
            _ => "invalid_request_error",
        };

        // Internal detail stays in the logs.
        let message = match &err {
            GatewayError::Internal { message } => {
                error!(detail = %message, "Internal error");
                "Something went wrong".to_string()
            }
            GatewayError::Blob { message } | GatewayError::Configuration { message } => {
                error!(detail = %message, "Server-side failure");
                err.to_string()
            }
            GatewayError::Completion { .. } => {
                error!(error = %err, "Completion service failure");
                err.to_string()
            }
            _ => err.to_string(),
        };

        Self {
            status,
            message,
            error_type,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "type": self.error_type,
            }
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_statuses() {
        let err: ApiError = GatewayError::invalid_input("bad").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = GatewayError::RateLimited.into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_type, "rate_limit_error");

        let err: ApiError = GatewayError::PayloadTooLarge.into();
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);

        let err: ApiError = GatewayError::completion("upstream said no").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("upstream said no"));
    }

    #[test]
    fn test_internal_detail_is_not_surfaced() {
        let err: ApiError = GatewayError::internal("secret stack trace").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret"));
        assert_eq!(err.message, "Something went wrong");
    }
}
