//! # Rate Limiting
//!
//! Per-client sliding windows: a strict one for lead mutations and a looser
//! one for interactive listing. Limiters sit behind the [`RateLimiter`] trait
//! so a shared store can replace the in-process implementation.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use chrono::{DateTime, TimeDelta, Utc};
use lru::LruCache;
use thiserror::Error;

use crate::config::RateLimitConfig;
use crate::error::{ApiError, LeadError};
use crate::server::AppState;

/// Outcome of a single limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    /// Requests left in the current window; 0 when rejected
    pub remaining: u32,
    /// When the oldest counted request leaves the window
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// Counts one request against `key` and reports whether it may proceed.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str) -> Result<RateLimitDecision, RateLimitError>;
}

/// In-process sliding log keyed by client address.
///
/// Only the most recently seen `max_keys` addresses are tracked; older
/// entries are evicted, which resets their window.
pub struct SlidingWindowLimiter {
    limit: u32,
    window: TimeDelta,
    hits: Mutex<LruCache<String, VecDeque<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window_seconds: u64, max_keys: usize) -> Self {
        let capacity = NonZeroUsize::new(max_keys).unwrap_or(NonZeroUsize::MIN);
        Self {
            limit,
            window: i64::try_from(window_seconds)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or_else(|| TimeDelta::days(1)),
            hits: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Checks `key` as of `now`.
    pub fn check_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let mut hits = self
            .hits
            .lock()
            .map_err(|_| RateLimitError::Unavailable("limiter state poisoned".to_string()))?;
        let log = hits.get_or_insert_mut(key.to_string(), VecDeque::new);

        let window_start = now - self.window;
        while log.front().is_some_and(|&hit| hit <= window_start) {
            log.pop_front();
        }

        let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
        if used >= self.limit {
            let oldest = log.front().copied().unwrap_or(now);
            return Ok(RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_at: oldest + self.window,
            });
        }

        log.push_back(now);
        let oldest = log.front().copied().unwrap_or(now);
        Ok(RateLimitDecision {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - used - 1,
            reset_at: oldest + self.window,
        })
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        self.check_at(key, Utc::now())
    }
}

/// The two independent windows applied to lead routes.
#[derive(Clone)]
pub struct RateLimits {
    pub write: Arc<dyn RateLimiter>,
    pub read: Arc<dyn RateLimiter>,
}

impl RateLimits {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            write: Arc::new(SlidingWindowLimiter::new(
                config.write_per_minute,
                config.window_seconds,
                config.max_tracked_keys,
            )),
            read: Arc::new(SlidingWindowLimiter::new(
                config.read_per_minute,
                config.window_seconds,
                config.max_tracked_keys,
            )),
        }
    }
}

impl FromRef<AppState> for RateLimits {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rate_limits.clone()
    }
}

/// Which window a check counted against, used as a metrics label.
#[derive(Debug, Clone, Copy)]
pub enum Window {
    Write,
    Read,
}

impl Window {
    fn label(self) -> &'static str {
        match self {
            Window::Write => "write",
            Window::Read => "read",
        }
    }
}

/// Counts a request and turns a rejection into [`LeadError::RateLimited`].
///
/// A limiter that cannot answer lets the request through.
pub async fn enforce(
    limiter: &dyn RateLimiter,
    window: Window,
    client: &ClientIp,
) -> Result<(), LeadError> {
    match limiter.check(&client.key()).await {
        Ok(decision) if decision.allowed => Ok(()),
        Ok(decision) => {
            metrics::counter!("rate_limit_rejections_total", "window" => window.label())
                .increment(1);
            tracing::warn!(
                client = %client.0,
                window = window.label(),
                limit = decision.limit,
                "Rate limit exceeded"
            );
            Err(LeadError::RateLimited(decision))
        }
        Err(err) => {
            tracing::warn!(error = %err, window = window.label(), "Rate limiter unavailable");
            Ok(())
        }
    }
}

/// Client network address used as the rate-limit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    pub fn key(&self) -> String {
        self.0.to_string()
    }

    /// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer, then loopback.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<IpAddr>().ok())
        };

        let ip = forwarded
            .or_else(real_ip)
            .or(peer.map(|addr| addr.ip()))
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        Self(ip)
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(&parts.headers, peer))
    }
}

/// Extractor that counts the request against the write window.
///
/// Placed on every mutating lead route; rejection is a 429.
#[derive(Debug, Clone, Copy)]
pub struct WriteQuota;

impl<S> FromRequestParts<S> for WriteQuota
where
    RateLimits: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let limits = RateLimits::from_ref(state);
        let client = match ClientIp::from_request_parts(parts, state).await {
            Ok(client) => client,
            Err(never) => match never {},
        };
        enforce(limits.write.as_ref(), Window::Write, &client).await?;
        Ok(WriteQuota)
    }
}
