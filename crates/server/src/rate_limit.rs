use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use cinebridge_core::error::ApiError;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::AppError;

/// Upper bound on tracked clients before eviction kicks in.
pub const DEFAULT_MAX_CLIENTS: usize = 1000;

/// Sliding-window limiter keyed by client.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    max_requests: u64,
    window: Duration,
    max_clients: usize,
}

struct Bucket {
    hits: VecDeque<Instant>,
    last_seen: Instant,
}

struct RateLimiterInner {
    buckets: HashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self::with_max_clients(max_requests, window_secs, DEFAULT_MAX_CLIENTS)
    }

    pub fn with_max_clients(max_requests: u64, window_secs: u64, max_clients: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                buckets: HashMap::new(),
            })),
            max_requests,
            window: Duration::from_secs(window_secs),
            max_clients: max_clients.max(1),
        }
    }

    /// Record a request. Returns the remaining allowance, or Err with retry-after seconds.
    pub async fn check(&self, key: &str) -> Result<u64, u64> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<u64, u64> {
        let mut inner = self.inner.lock().await;
        let window = self.window;

        let bucket = inner.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            hits: VecDeque::new(),
            last_seen: now,
        });
        bucket.last_seen = now;
        while bucket
            .hits
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= window)
        {
            bucket.hits.pop_front();
        }

        let result = if bucket.hits.len() as u64 >= self.max_requests {
            let retry_after = bucket
                .hits
                .front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window);
            Err(ceil_secs(retry_after).max(1))
        } else {
            bucket.hits.push_back(now);
            Ok(self.max_requests - bucket.hits.len() as u64)
        };

        if inner.buckets.len() > self.max_clients {
            inner.evict(now, window, self.max_clients);
        }
        result
    }

    pub async fn tracked_clients(&self) -> usize {
        self.inner.lock().await.buckets.len()
    }
}

impl RateLimiterInner {
    /// Drop idle clients first, then the least recently seen until within `max_clients`.
    fn evict(&mut self, now: Instant, window: Duration, max_clients: usize) {
        let before = self.buckets.len();
        self.buckets.retain(|_, b| {
            b.hits
                .back()
                .is_some_and(|t| now.saturating_duration_since(*t) < window)
        });

        if self.buckets.len() > max_clients {
            let mut by_age: Vec<(Instant, String)> = self
                .buckets
                .iter()
                .map(|(k, b)| (b.last_seen, k.clone()))
                .collect();
            by_age.sort();
            let excess = self.buckets.len() - max_clients;
            for (_, key) in by_age.into_iter().take(excess) {
                self.buckets.remove(&key);
            }
        }
        debug!(
            evicted = before - self.buckets.len(),
            remaining = self.buckets.len(),
            "rate limiter evicted clients"
        );
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Client identity: first `x-forwarded-for` hop, then `x-real-ip`, then the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware for the playback routes.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let Some(rate_limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let key = client_key(request.headers(), peer);

    match rate_limiter.check(&key).await {
        Ok(_remaining) => next.run(request).await,
        Err(retry_after) => {
            warn!(client = %key, path = %request.uri().path(), retry_after, "rate limit exceeded");
            let mut response = AppError(ApiError::TooManyRequests {
                retry_after_secs: retry_after,
            })
            .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
