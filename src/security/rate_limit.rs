//! Fixed-window rate limiting per client.
//!
//! Each client identity owns one counter and the instant its window
//! started. A request arriving one full window after the start resets the
//! counter. Bursts of up to twice the limit across a window boundary are
//! possible and accepted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::error::{AppError, Failure};
use crate::http::server::AppState;
use crate::observability::metrics;

pub const RATE_LIMIT_POLICY: &str = "ratelimit-policy";
pub const RATE_LIMIT_LIMIT: &str = "ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "ratelimit-reset";

/// Counter state for one client.
#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    count: u32,
    started_at: Instant,
}

/// Result of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time left until the client's window resets.
    pub reset_after: Duration,
}

/// Per-client request counters.
///
/// Updates for one client happen under that client's map shard lock, so a
/// read-modify-write never interleaves with another for the same client.
pub struct RateLimiter {
    windows: DashMap<String, RateLimitWindow>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: config.window(),
        }
    }

    /// Count a request from `identity` at `now`.
    ///
    /// Throttled requests still count against the window.
    pub fn admit(&self, identity: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert(RateLimitWindow {
                count: 0,
                started_at: now,
            });

        let window = entry.value_mut();
        if now.saturating_duration_since(window.started_at) >= self.window {
            window.count = 0;
            window.started_at = now;
        }
        window.count = window.count.saturating_add(1);

        let elapsed = now.saturating_duration_since(window.started_at);
        RateLimitDecision {
            admitted: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started_at) < self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Periodically evict expired windows until shutdown.
pub async fn run_sweeper(limiter: Arc<RateLimiter>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(limiter.window());
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.evict_expired(Instant::now());
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = limiter.tracked_clients(),
                        "Evicted expired rate limit windows"
                    );
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

/// Identity used for throttling: the peer IP, when the server knows it.
pub fn client_identity<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Insert the standard rate limit headers.
pub fn add_rate_limit_headers(
    headers: &mut HeaderMap,
    decision: &RateLimitDecision,
    window: Duration,
) {
    let reset_secs = decision.reset_after.as_millis().div_ceil(1000);
    let policy = format!("{};w={}", decision.limit, window.as_secs());

    let values = [
        (RATE_LIMIT_POLICY, policy),
        (RATE_LIMIT_LIMIT, decision.limit.to_string()),
        (RATE_LIMIT_REMAINING, decision.remaining.to_string()),
        (RATE_LIMIT_RESET, reset_secs.to_string()),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(&request);
    let decision = state.limiter.admit(&identity, Instant::now());

    let mut response = if decision.admitted {
        next.run(request).await
    } else {
        tracing::warn!(client = %identity, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        Failure::from(AppError::rate_limited()).into_response()
    };

    add_rate_limit_headers(response.headers_mut(), &decision, state.limiter.window());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_ms,
        })
    }

    #[test]
    fn test_throttles_after_max() {
        let limiter = limiter(3, 60_000);
        let now = Instant::now();
        for i in 1..=3 {
            let decision = limiter.admit("1.2.3.4", now);
            assert!(decision.admitted, "request {i} should pass");
            assert_eq!(decision.remaining, 3 - i);
        }
        let decision = limiter.admit("1.2.3.4", now);
        assert!(!decision.admitted);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60_000);
        let now = Instant::now();
        assert!(limiter.admit("a", now).admitted);
        assert!(!limiter.admit("a", now).admitted);
        assert!(limiter.admit("b", now).admitted);
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let limiter = limiter(2, 1_000);
        let start = Instant::now();
        assert!(limiter.admit("a", start).admitted);
        assert!(limiter.admit("a", start).admitted);
        assert!(!limiter.admit("a", start + Duration::from_millis(999)).admitted);

        let decision = limiter.admit("a", start + Duration::from_millis(1_000));
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_after, Duration::from_millis(1_000));
    }

    #[test]
    fn test_reset_after_counts_down() {
        let limiter = limiter(5, 10_000);
        let start = Instant::now();
        limiter.admit("a", start);
        let decision = limiter.admit("a", start + Duration::from_millis(2_500));
        assert_eq!(decision.reset_after, Duration::from_millis(7_500));
    }

    #[test]
    fn test_evict_expired() {
        let limiter = limiter(5, 1_000);
        let start = Instant::now();
        limiter.admit("old", start);
        limiter.admit("new", start + Duration::from_millis(800));

        let removed = limiter.evict_expired(start + Duration::from_millis(1_200));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_headers() {
        let decision = RateLimitDecision {
            admitted: true,
            limit: 100,
            remaining: 97,
            reset_after: Duration::from_millis(899_001),
        };
        let mut headers = HeaderMap::new();
        add_rate_limit_headers(&mut headers, &decision, Duration::from_secs(900));
        assert_eq!(headers.get(RATE_LIMIT_POLICY).unwrap(), "100;w=900");
        assert_eq!(headers.get(RATE_LIMIT_LIMIT).unwrap(), "100");
        assert_eq!(headers.get(RATE_LIMIT_REMAINING).unwrap(), "97");
        assert_eq!(headers.get(RATE_LIMIT_RESET).unwrap(), "900");
    }

    #[test]
    fn test_client_identity() {
        let mut request = Request::builder().body(()).unwrap();
        assert_eq!(client_identity(&request), "unknown");

        let addr: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_identity(&request), "10.0.0.7");
    }
}
