//! Cancellable completion event stream.
//!
//! The streaming relay consumes upstream completion output through this
//! abstraction rather than any particular provider client shape: a plain
//! `next()`/`cancel()` contract over a boxed event stream.

use futures::stream::BoxStream;
use futures_util::StreamExt;

/// One event in a live completion sequence.
///
/// A well-formed sequence is zero or more `Delta` events terminated by exactly
/// one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text fragment.
    Delta(String),
    /// Normal end of the sequence.
    Done,
    /// Upstream failure after streaming started; carries the upstream message.
    Error(String),
}

impl StreamEvent {
    /// Whether this event terminates the sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// A cancellable source of [`StreamEvent`]s.
///
/// Guarantees enforced here, independent of the inner stream's behavior:
/// - after a terminal event has been yielded, `next()` always returns `None`;
/// - after `cancel()`, `next()` always returns `None`;
/// - the cancel hook runs at most once, and never after normal termination.
///
/// Cancelling drops the inner stream, which aborts upstream consumption (for
/// an HTTP-backed stream, dropping the body stream tears down the request).
pub struct CompletionStream {
    inner: Option<BoxStream<'static, StreamEvent>>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
    terminated: bool,
}

impl CompletionStream {
    /// Wrap an event stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = StreamEvent> + Send + 'static,
    {
        Self {
            inner: Some(stream.boxed()),
            on_cancel: None,
            terminated: false,
        }
    }

    /// Register a hook invoked when the stream is cancelled. Runs at most
    /// once; not invoked on normal termination.
    #[must_use]
    pub fn with_cancel_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Next event, or `None` once the sequence has terminated or been
    /// cancelled.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.terminated {
            return None;
        }

        let inner = self.inner.as_mut()?;
        match inner.next().await {
            Some(event) => {
                if event.is_terminal() {
                    self.finish();
                }
                Some(event)
            }
            None => {
                // Upstream ended without a terminal event; treat as exhausted.
                self.finish();
                None
            }
        }
    }

    /// Stop upstream consumption promptly. Idempotent; no events are yielded
    /// afterwards.
    pub fn cancel(&mut self) {
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
        self.inner = None;
        self.terminated = true;
    }

    /// Whether the sequence has terminated (normally or by cancellation).
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn finish(&mut self) {
        self.terminated = true;
        self.inner = None;
        // Normal termination must not fire the cancel hook.
        self.on_cancel = None;
    }
}

impl std::fmt::Debug for CompletionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionStream")
            .field("terminated", &self.terminated)
            .field("has_cancel_hook", &self.on_cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn stream_of(events: Vec<StreamEvent>) -> CompletionStream {
        CompletionStream::new(futures::stream::iter(events))
    }

    #[tokio::test]
    async fn test_yields_events_in_order_until_done() {
        let mut stream = stream_of(vec![
            StreamEvent::Delta("a".to_string()),
            StreamEvent::Delta("b".to_string()),
            StreamEvent::Done,
        ]);

        assert_eq!(stream.next().await, Some(StreamEvent::Delta("a".to_string())));
        assert_eq!(stream.next().await, Some(StreamEvent::Delta("b".to_string())));
        assert_eq!(stream.next().await, Some(StreamEvent::Done));
        assert_eq!(stream.next().await, None);
        assert!(stream.is_terminated());
    }

    #[tokio::test]
    async fn test_nothing_after_error_event() {
        let mut stream = stream_of(vec![
            StreamEvent::Error("boom".to_string()),
            StreamEvent::Delta("stray".to_string()),
        ]);

        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Error("boom".to_string()))
        );
        // The stray delta after the terminal event is suppressed.
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_cancel_stops_events_and_fires_hook_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut stream = stream_of(vec![
            StreamEvent::Delta("a".to_string()),
            StreamEvent::Delta("b".to_string()),
            StreamEvent::Done,
        ])
        .with_cancel_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(stream.next().await, Some(StreamEvent::Delta("a".to_string())));
        stream.cancel();
        assert_eq!(stream.next().await, None);
        stream.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_hook_not_fired_on_normal_termination() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut stream = stream_of(vec![StreamEvent::Done]).with_cancel_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(stream.next().await, Some(StreamEvent::Done));
        stream.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_upstream_terminates() {
        let mut stream = stream_of(vec![StreamEvent::Delta("only".to_string())]);
        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Delta("only".to_string()))
        );
        assert_eq!(stream.next().await, None);
        assert!(stream.is_terminated());
    }
}
