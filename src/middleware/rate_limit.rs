use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::error::AppError;
use crate::AppState;

/// Buckets untouched for this long are evicted by the sweeper.
pub const IDLE_TTL: Duration = Duration::from_secs(180);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Per-client token buckets (single-instance deployments only).
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    rate_per_second: f64,
    burst: f64,
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate_per_second: rate_per_second.max(0.0),
            burst: burst.max(1) as f64,
        }
    }

    /// Take one token for `key`. Returns the tokens left, or how long until
    /// the next one is available.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<u32, Duration> {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_string()).or_insert(TokenBucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_second).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(bucket.tokens as u32);
        }

        if self.rate_per_second <= 0.0 {
            return Err(SWEEP_INTERVAL);
        }
        let missing = 1.0 - bucket.tokens;
        // tiny rates overflow Duration; treat them like a zero rate
        Err(Duration::try_from_secs_f64(missing / self.rate_per_second).unwrap_or(SWEEP_INTERVAL))
    }

    /// Evict buckets idle for longer than `IDLE_TTL`.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= IDLE_TTL);
        before - buckets.len()
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = limiter.sweep().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted idle rate limit buckets");
                }
            }
        })
    }
}

/// Per-IP throttling for every route. Requests without peer info share
/// a single "unknown" bucket.
pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());

    match state.rate_limiter.check(&ip).await {
        Ok(remaining) => {
            tracing::trace!(ip = %ip, remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            let secs = retry_after.as_secs_f64().ceil() as u64;
            tracing::warn!(
                ip = %ip,
                path = %req.uri().path(),
                retry_after_secs = secs,
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited {
                retry_after_secs: secs,
            })
        }
    }
}
