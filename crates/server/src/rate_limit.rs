use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared_types::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sliding window rate limit state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Arc<Mutex<RateLimitInner>>,
}

struct RateLimitInner {
    /// Map from client key to request timestamps inside the window.
    requests: HashMap<String, Vec<Instant>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitState {
    /// Create a rate limiter allowing `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimitInner {
                requests: HashMap::new(),
                max_requests,
                window,
            })),
        }
    }

    /// Check if a request from `key` is allowed, recording it if so.
    fn check(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let cutoff = now - inner.window;
        let max = inner.max_requests;

        let timestamps = inner.requests.entry(key.to_string()).or_default();
        timestamps.retain(|t| *t > cutoff);

        if timestamps.len() as u32 >= max {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Middleware that throttles brute-force attempts on the login endpoint.
///
/// The client key comes from `X-Forwarded-For` (first hop) when a proxy
/// sets it; direct connections collapse to one shared bucket, which is
/// still enough to blunt a single-source credential-stuffing loop.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .unwrap_or("direct")
        .trim()
        .to_string();

    if !state.check(&key) {
        tracing::warn!(client = %key, "Login rate limit exceeded");
        return AppError::rate_limited("Too many login attempts. Please try again later.")
            .into_response();
    }

    next.run(request).await
}
