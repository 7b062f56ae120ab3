//! Retry policy for logical API calls.
//!
//! Retries belong to the client, never to the pagination driver: a page
//! request either succeeds after its retries or fails the scan. Which
//! failures are retried is decided by [`GitHubError::is_retryable`].

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::github::{GitHubError, short_error_message};

/// Upper bound for a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// First backoff delay; doubled on every further attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum retries for a single logical call.
pub const MAX_RETRIES: usize = 5;

/// Backoff settings for the client's calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Attempts after the first one. Zero disables retries.
    pub max_retries: usize,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: INITIAL_BACKOFF,
            max_delay: MAX_BACKOFF,
            max_retries: MAX_RETRIES,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A configuration that makes exactly one attempt.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run one logical API call, retrying the failures GitHub may recover from.
///
/// `label` names the call in logs: a REST route or a GraphQL operation.
pub async fn retry_call<T, F, Fut>(
    label: &str,
    config: &RetryConfig,
    mut call: F,
) -> Result<T, GitHubError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubError>>,
{
    let attempts = AtomicU32::new(0);

    let result = (|| {
        attempts.fetch_add(1, Ordering::Relaxed);
        call()
    })
    .retry(config.backoff())
    .when(GitHubError::is_retryable)
    .notify(|err: &GitHubError, delay| {
        tracing::debug!(
            "Retrying {} in {:?} (attempt {}): {}",
            label,
            delay,
            attempts.load(Ordering::Relaxed),
            short_error_message(err)
        );
    })
    .await;

    if let Err(err) = &result {
        let attempts = attempts.load(Ordering::Relaxed);
        if attempts > 1 {
            tracing::warn!("{} failed after {} attempts: {}", label, attempts, short_error_message(err));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::http::HttpError;

    fn counted<T: Clone + Send + 'static>(
        calls: &Arc<AtomicU32>,
        outcome: impl Fn(u32) -> Result<T, GitHubError> + Send + Sync + 'static,
    ) -> impl FnMut() -> std::future::Ready<Result<T, GitHubError>> {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(outcome(n))
        }
    }

    #[test]
    fn test_retry_config_builders() {
        let config = RetryConfig::default();
        assert_eq!(config.min_delay, INITIAL_BACKOFF);
        assert_eq!(config.max_retries, MAX_RETRIES);
        assert!(config.jitter);

        let config = RetryConfig::default()
            .with_delays(Duration::from_secs(2), Duration::from_secs(1))
            .without_jitter();
        assert_eq!(config.max_delay, Duration::from_secs(2));
        assert!(!config.jitter);

        assert_eq!(RetryConfig::disabled().max_retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_call(
            "/repos/octo/hello",
            &RetryConfig::default(),
            counted(&calls, |n| {
                if n < 2 {
                    Err(GitHubError::Status {
                        status: 502,
                        message: "bad gateway".into(),
                    })
                } else {
                    Ok(42u32)
                }
            }),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = retry_call(
            "Repository",
            &RetryConfig::default(),
            counted(&calls, |_| Err::<(), _>(GitHubError::not_found("octo/missing"))),
        )
        .await
        .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::default().with_max_retries(2);
        let err = retry_call(
            "/rate_limit",
            &config,
            counted(&calls, |_| {
                Err::<(), _>(GitHubError::RateLimited {
                    reset_at: Utc::now(),
                })
            }),
        )
        .await
        .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_makes_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let _ = retry_call(
            "Issues",
            &RetryConfig::disabled(),
            counted(&calls, |_| {
                Err::<(), _>(GitHubError::Http(HttpError::Transport("reset".into())))
            }),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
