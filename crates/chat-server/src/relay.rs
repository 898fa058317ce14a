//! Streaming relay between a completion stream and the SSE response body.
//!
//! The relay walks a small lifecycle: `Open` while frames are flowing,
//! `Closing` once a terminal frame has been produced, `Closed` after the
//! response body finished, and `Cancelled` when the client went away first.
//! Dropping a relay that is still `Open` cancels the upstream stream, which
//! is how a mid-stream client disconnect releases the provider connection.

use async_stream::stream;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chat_core::{CompletionStream, StreamEvent};
use serde_json::json;
use std::convert::Infallible;
use tracing::debug;

/// Sentinel data frame that terminates every stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Relay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Frames are still being produced.
    Open,
    /// A terminal frame was produced; the sentinel has been emitted.
    Closing,
    /// The client disconnected before the stream finished.
    Cancelled,
    /// The response body completed normally.
    Closed,
}

/// Forwards completion events to the client as serialized SSE data frames.
pub struct StreamRelay {
    upstream: CompletionStream,
    state: RelayState,
}

impl StreamRelay {
    /// Wraps an established completion stream.
    #[must_use]
    pub fn new(upstream: CompletionStream) -> Self {
        Self {
            upstream,
            state: RelayState::Open,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Produces the next data frame, or `None` once the relay is not open.
    ///
    /// Text deltas become `{"delta": ...}` frames, an in-band error becomes a
    /// final `{"error": ...}` frame, and both upstream completion and
    /// exhaustion produce the `[DONE]` sentinel. Exactly one terminal frame
    /// is ever emitted.
    pub async fn next_frame(&mut self) -> Option<String> {
        if self.state != RelayState::Open {
            return None;
        }

        match self.upstream.next().await {
            Some(StreamEvent::Delta(text)) => Some(json!({ "delta": text }).to_string()),
            Some(StreamEvent::Error(message)) => {
                self.state = RelayState::Closing;
                Some(json!({ "error": message }).to_string())
            }
            Some(StreamEvent::Done) | None => {
                self.state = RelayState::Closing;
                Some(DONE_SENTINEL.to_string())
            }
        }
    }

    /// Marks a closing relay as fully closed.
    pub fn finish(&mut self) {
        if self.state == RelayState::Closing {
            self.state = RelayState::Closed;
        }
    }

    /// Cancels the upstream stream. No-op unless the relay is still open.
    pub fn cancel(&mut self) {
        if self.state == RelayState::Open {
            debug!("Client disconnected mid-stream, cancelling upstream");
            self.upstream.cancel();
            self.state = RelayState::Cancelled;
        }
    }

    /// Converts the relay into an SSE response with keep-alive pings.
    #[must_use]
    pub fn into_response(mut self) -> Response {
        let body = stream! {
            while let Some(frame) = self.next_frame().await {
                yield Ok::<_, Infallible>(Event::default().data(frame));
            }
            self.finish();
        };

        let mut response = Sse::new(body).keep_alive(KeepAlive::default()).into_response();
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-cache"),
        );
        response
    }
}

impl Drop for StreamRelay {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for StreamRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRelay")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
