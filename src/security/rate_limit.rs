//! Per-client token-bucket rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::container::{BoxError, Component, Initialize, Terminate};
use crate::http::error::ApiError;
use crate::observability::metrics;

type Buckets = Arc<Mutex<HashMap<String, Arc<TokenBucket>>>>;

/// A token bucket with its own lock, usable without the registry lock.
struct TokenBucket {
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_update: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_update: now,
                last_seen: now,
            }),
        }
    }

    fn try_acquire(&self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        let elapsed = now.duration_since(state.last_update).as_secs_f64();

        state.tokens = (state.tokens + elapsed * refill_rate).min(capacity);
        state.last_update = state.last_update.max(now);
        state.last_seen = state.last_seen.max(now);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn touch(&self, now: Instant) {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        state.last_seen = state.last_seen.max(now);
    }

    fn last_seen(&self) -> Instant {
        self.state.lock().expect("token bucket mutex poisoned").last_seen
    }
}

/// Registry of per-client buckets, created on first sight of a client.
pub struct RateLimiter {
    buckets: Buckets,
    rate: f64,
    burst: f64,
    enabled: bool,
    idle_ttl: Duration,
    sweep_interval: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Arc::default(),
            rate: config.requests_per_second,
            burst: config.burst_size as f64,
            enabled: config.enabled,
            idle_ttl: Duration::from_secs(config.idle_ttl_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            sweeper: Mutex::new(None),
        }
    }

    /// Take one token for `key`. Never blocks or queues.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        self.obtain(key, now).try_acquire(self.burst, self.rate, now)
    }

    /// Lookup-or-create; the registry lock is released before the bucket is used.
    ///
    /// `last_seen` is refreshed under the registry lock, so a sweep running
    /// between here and the token spend cannot evict the bucket.
    fn obtain(&self, key: &str, now: Instant) -> Arc<TokenBucket> {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        if let Some(bucket) = buckets.get(key) {
            bucket.touch(now);
            return bucket.clone();
        }
        let bucket = Arc::new(TokenBucket::new(self.burst, now));
        buckets.insert(key.to_string(), bucket.clone());
        bucket
    }

    /// Drop buckets idle for longer than the configured TTL.
    pub fn sweep(&self, now: Instant) -> usize {
        sweep_idle(&self.buckets, self.idle_ttl, now)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.lock().expect("rate limiter mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn sweep_idle(buckets: &Buckets, idle_ttl: Duration, now: Instant) -> usize {
    let mut buckets = buckets.lock().expect("rate limiter mutex poisoned");
    let before = buckets.len();
    buckets.retain(|_, bucket| now.duration_since(bucket.last_seen()) < idle_ttl);
    before - buckets.len()
}

impl Component for RateLimiter {
    fn initializer(&self) -> Option<&dyn Initialize> {
        self.enabled.then_some(self as &dyn Initialize)
    }

    fn terminator(&self) -> Option<&dyn Terminate> {
        self.enabled.then_some(self as &dyn Terminate)
    }
}

#[async_trait]
impl Initialize for RateLimiter {
    /// Start the idle-bucket sweeper.
    async fn initialize(&self) -> Result<(), BoxError> {
        let buckets = self.buckets.clone();
        let idle_ttl = self.idle_ttl;
        let mut ticker = tokio::time::interval(self.sweep_interval.max(Duration::from_secs(1)));

        let handle = tokio::spawn(async move {
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = sweep_idle(&buckets, idle_ttl, Instant::now());
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted idle rate limiter buckets");
                }
            }
        });

        let previous = self
            .sweeper
            .lock()
            .expect("rate limiter mutex poisoned")
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl Terminate for RateLimiter {
    /// Stop the sweeper.
    async fn terminate(&self) -> Result<(), BoxError> {
        let handle = self.sweeper.lock().expect("rate limiter mutex poisoned").take();
        if let Some(handle) = handle {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    return Err(Box::new(e));
                }
            }
        }
        Ok(())
    }
}

/// Client key: the peer IP when the connection info is available.
fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects callers over their budget with 429. Preflight requests bypass it.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let key = client_key(&request);
    if limiter.allow(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::TooManyRequests.into_response()
    }
}
