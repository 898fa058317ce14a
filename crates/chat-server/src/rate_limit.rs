//! Fixed-window rate limiting.
//!
//! Every client address gets a counter inside a shared window. When the
//! window elapses the next check resets it for everyone at once, so all
//! counters restart on the same boundary.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chat_config::RateLimitConfig;
use chat_core::GatewayError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::ApiError;
use crate::extractors::ClientIp;
use crate::state::AppState;

struct Window {
    started_at: Instant,
    counts: HashMap<String, u32>,
}

/// Fixed-window request counter shared by all rate-limited endpoints.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    state: Mutex<Window>,
}

impl RateLimiter {
    /// Creates a limiter from the configured window and ceiling.
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: config.window,
            max_requests: config.max_requests,
            state: Mutex::new(Window {
                started_at: Instant::now(),
                counts: HashMap::new(),
            }),
        }
    }

    /// Admits or rejects one request for `key`.
    ///
    /// Compare-then-increment under the lock: a rejected request does not
    /// consume budget, so the client's count cannot exceed the ceiling.
    pub fn check(&self, key: &str) -> Result<(), GatewayError> {
        let mut window = self.state.lock();

        if window.started_at.elapsed() >= self.window {
            window.started_at = Instant::now();
            window.counts.clear();
        }

        let count = window.counts.entry(key.to_string()).or_insert(0);
        if *count >= self.max_requests {
            return Err(GatewayError::RateLimited);
        }
        *count += 1;
        Ok(())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .finish_non_exhaustive()
    }
}

/// Middleware applying the shared limiter to every `/api` route.
///
/// Requests without a resolvable client address share the `"unknown"` bucket.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = ip.unwrap_or_else(|| "unknown".to_string());

    if let Err(err) = state.limiter.check(&key) {
        warn!(client = %key, "Rate limit exceeded");
        return Err(err.into());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window: Duration, max_requests: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            window,
            max_requests,
        })
    }

    #[test]
    fn test_admits_up_to_ceiling_then_rejects() {
        let limiter = limiter(Duration::from_secs(60), 3);
        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").is_ok());
        }
        assert!(matches!(
            limiter.check("1.2.3.4"),
            Err(GatewayError::RateLimited)
        ));
        // Other clients are unaffected.
        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[test]
    fn test_rejected_requests_do_not_consume_budget() {
        let limiter = limiter(Duration::from_secs(60), 1);
        assert!(limiter.check("a").is_ok());
        for _ in 0..10 {
            assert!(limiter.check("a").is_err());
        }
        let window = limiter.state.lock();
        assert_eq!(window.counts["a"], 1);
    }

    #[test]
    fn test_window_reset_clears_all_counters() {
        let limiter = limiter(Duration::from_millis(10), 1);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());

        std::thread::sleep(Duration::from_millis(20));

        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
    }
}
