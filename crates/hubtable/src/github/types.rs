//! GitHub REST data types shared by several tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single rate limit resource entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResource {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Requests used in current period.
    pub used: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// Unix timestamp when the rate limit resets.
    pub reset: u64,
}

impl RateLimitResource {
    /// Get the reset time as a DateTime.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// Response of `GET /rate_limit`.
///
/// GitHub adds resource buckets over time (`code_scanning_autofix`,
/// `dependency_snapshots`, ...), so they are kept as a map keyed by bucket
/// name instead of one field per bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRateLimitResponse {
    pub resources: BTreeMap<String, RateLimitResource>,
}

/// Envelope of every `/search/*` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}
