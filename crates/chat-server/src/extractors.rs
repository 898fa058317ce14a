//! Request extractors.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use chat_core::GatewayError;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

use crate::error::ApiError;

/// The client address used as the rate-limiting key.
///
/// Resolution order: first hop of `x-forwarded-for`, then `x-real-ip`, then
/// the peer address recorded by the connection layer. `None` when the server
/// was built without connect info, as in most tests.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Ok(Self(Some(first.to_string())));
                }
            }
        }

        if let Some(real_ip) = parts
            .headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
        {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return Ok(Self(Some(real_ip.to_string())));
            }
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self(peer))
    }
}

/// JSON body extractor that maps oversized payloads to the gateway taxonomy.
///
/// Axum's body collection rejects with 413 once the configured body limit is
/// hit; that rejection becomes [`GatewayError::PayloadTooLarge`] so the client
/// sees the same error shape as every other failure.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    GatewayError::PayloadTooLarge
                } else {
                    GatewayError::invalid_input(format!("failed to read body: {rejection}"))
                };
                return Err(err.into());
            }
        };

        let value = serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::invalid_input(format!("invalid JSON body: {e}")))?;

        Ok(Self(value))
    }
}
