//! Request middleware: per-client rate limiting and the admin write gate.
//!
//! # Rate limiting
//! Token bucket per client identity. Identity is the `X-Forwarded-For`
//! header when present (proxy deployments), otherwise the peer address.
//! Buckets refill one token per configured interval up to the burst size;
//! an empty bucket yields 429. A background task sweeps buckets idle for
//! five minutes so the map stays bounded.
//!
//! # Write authentication
//! When an API key is configured, mutations of the pack configuration must
//! present it in the `X-API-Key` header or the `api_key` query parameter.
//! Reads are never authenticated, and an unset key leaves writes open.
use crate::api::error::{api_rate_limited, api_unauthorized};
use crate::app::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
    last_seen: Instant,
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    refill: Duration,
    burst: u32,
}

impl RateLimiter {
    pub fn new(refill: Duration, burst: u32) -> Arc<Self> {
        Arc::new(Self {
            buckets: Mutex::new(HashMap::new()),
            refill,
            burst,
        })
    }

    /// Take a token for `client`, refilling for elapsed time first.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket {
                tokens: self.burst,
                last_refill: now,
                last_seen: now,
            });
        bucket.last_seen = now;

        let refill_ms = self.refill.as_millis().max(1);
        let earned = (now - bucket.last_refill).as_millis() / refill_ms;
        if earned > 0 {
            bucket.tokens = bucket
                .tokens
                .saturating_add(earned.min(u128::from(self.burst)) as u32)
                .min(self.burst);
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Periodically drop buckets that have not been seen recently.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(IDLE_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let Some(cutoff) = Instant::now().checked_sub(IDLE_SWEEP_INTERVAL) else {
                    continue;
                };
                limiter
                    .buckets
                    .lock()
                    .retain(|_, bucket| bucket.last_seen > cutoff);
            }
        });
    }
}

fn client_identity(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identity(&request);
    if !state.rate_limiter.allow(&client) {
        tracing::debug!(%client, "rate limit exceeded");
        return api_rate_limited().into_response();
    }
    next.run(request).await
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Reads are always open.
    if request.method() == Method::GET {
        return next.run(request).await;
    }
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .or_else(|| query_api_key(&request));
    if presented == Some(expected) {
        next.run(request).await
    } else {
        api_unauthorized("invalid or missing API key").into_response()
    }
}

fn query_api_key(request: &Request) -> Option<&str> {
    request
        .uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("api_key="))
}
