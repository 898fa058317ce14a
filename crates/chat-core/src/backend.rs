//! Completion backend trait.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::request::CompletionRequest;
use crate::response::Completion;
use crate::streaming::CompletionStream;

/// Abstract completion service collaborator.
///
/// Both entry points take the same normalized [`CompletionRequest`]. Neither
/// retries: completion calls are billable and side-effect-bearing, so retry
/// policy is a caller concern, not the gateway's.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Stable identifier for this backend instance.
    fn id(&self) -> &str;

    /// Fallback model used when the caller omits one.
    fn default_model(&self) -> &str;

    /// Dispatch a whole-response completion.
    ///
    /// # Errors
    /// [`GatewayError::Completion`] on any transport or provider-side failure,
    /// carrying the upstream message.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError>;

    /// Dispatch an incremental completion, returning a cancellable event
    /// source. Each `Delta` carries a text fragment; exactly one `Done` or
    /// `Error` terminates the source.
    ///
    /// # Errors
    /// [`GatewayError::Completion`] when the stream cannot be established
    /// (failures after establishment arrive as in-band `Error` events).
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, GatewayError>;
}
