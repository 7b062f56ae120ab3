//! Proactive request pacing and rate-limit header parsing.

use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::HttpHeaders;
use crate::http::header_get;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour; 10/sec leaves room for bursts.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// A shared API rate limiter using the governor crate.
///
/// Cloning is cheap; clones share one quota.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` (zero is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

/// Rate limit state reported by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
    /// Which resource bucket the response counted against (`core`, `graphql`, ...).
    pub resource: Option<String>,
}

impl RateLimitInfo {
    /// Extract rate limit info from GitHub's `x-ratelimit-*` headers.
    pub fn from_headers(headers: &HttpHeaders) -> Option<Self> {
        let limit = header_get(headers, "x-ratelimit-limit")?.parse::<usize>().ok()?;
        let remaining = header_get(headers, "x-ratelimit-remaining")?
            .parse::<usize>()
            .ok()?;
        let reset_epoch = header_get(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
        let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
        let resource = header_get(headers, "x-ratelimit-resource").map(String::from);

        Some(Self {
            limit,
            remaining,
            reset_at,
            resource,
        })
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}
