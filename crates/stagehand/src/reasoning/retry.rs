//! Explicit retry with exponential backoff and jitter.
//!
//! Nothing in this crate retries implicitly. [`Retrying`] is a decorator a
//! call site wraps around its [`ReasoningService`] when it wants bounded
//! retry of transient failures (429, 5xx, network timeouts). Permanent
//! errors (400, 401) are never retried.

use std::time::Duration;

use tracing::warn;

use super::service::{CompletionFuture, ReasoningService};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (0 = no retries, just fail immediately).
    pub max_retries: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier (typically 2.0 for exponential backoff).
    pub multiplier: f64,
    /// Whether to add jitter to prevent thundering herd.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with the given number of retries. Uses sensible defaults.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // Deterministic jitter keyed on the attempt number; not worth
            // pulling in rand for this.
            let jitter_factor = match attempt % 4 {
                0 => 0.75,
                1 => 0.90,
                2 => 0.60,
                3 => 0.85,
                _ => 0.80,
            };
            Duration::from_secs_f64(capped * jitter_factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// Whether an error string indicates a transient (retryable) failure.
pub fn is_transient_error(error: &str) -> bool {
    let transient_statuses = ["429", "500", "502", "503", "504"];
    if transient_statuses
        .iter()
        .any(|s| error.contains(&format!("HTTP {s}")))
    {
        return true;
    }

    let lower = error.to_lowercase();
    [
        "request failed:",
        "connection reset",
        "connection refused",
        "timed out",
        "timeout",
        "broken pipe",
        "network",
    ]
    .iter()
    .any(|p| lower.contains(p))
}

/// Whether an error is a permanent (non-retryable) failure.
pub fn is_permanent_error(error: &str) -> bool {
    [
        "HTTP 400",
        "HTTP 401",
        "HTTP 403",
        "HTTP 404",
        "HTTP 422",
        "invalid",
        "bad request",
        "unauthorized",
    ]
    .iter()
    .any(|p| error.contains(p))
}

/// Retry decorator around any [`ReasoningService`].
///
/// ```ignore
/// let service = Retrying::new(HttpReasoningService::new(endpoint)?, RetryConfig::with_retries(3));
/// ```
pub struct Retrying<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: ReasoningService> Retrying<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

impl<S: ReasoningService> ReasoningService for Retrying<S> {
    fn complete(&self, prompt: &str) -> CompletionFuture<'_> {
        let prompt = prompt.to_string();
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                match self.inner.complete(&prompt).await {
                    Ok(v) => return Ok(v),
                    Err(e) => {
                        if attempt < self.config.max_retries
                            && is_transient_error(&e)
                            && !is_permanent_error(&e)
                        {
                            let delay = self.config.delay_for_attempt(attempt);
                            warn!(
                                "transient reasoning error (attempt {}/{}): {e}. Retrying in {delay:?}...",
                                attempt + 1,
                                self.config.max_retries,
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        } else {
                            return Err(e);
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::service::FnService;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_config_no_retries() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn delay_increases_exponentially() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(5)
        };
        let d0 = config.delay_for_attempt(0);
        let d1 = config.delay_for_attempt(1);
        let d2 = config.delay_for_attempt(2);

        assert!(d1 > d0, "d1={d1:?} should be > d0={d0:?}");
        assert!(d2 > d1, "d2={d2:?} should be > d1={d1:?}");
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig {
            jitter: false,
            max_delay: Duration::from_secs(2),
            ..RetryConfig::with_retries(10)
        };
        assert!(config.delay_for_attempt(10) <= Duration::from_secs(2));
    }

    #[test]
    fn jitter_reduces_delay() {
        let with = RetryConfig::with_retries(3);
        let without = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(3)
        };
        assert!(with.delay_for_attempt(2) <= without.delay_for_attempt(2));
    }

    #[test]
    fn transient_errors_detected() {
        assert!(is_transient_error("reasoning service HTTP 429: rate limited"));
        assert!(is_transient_error("reasoning service HTTP 502: bad gateway"));
        assert!(is_transient_error("request failed: connection reset"));
    }

    #[test]
    fn permanent_errors_not_transient() {
        assert!(is_permanent_error("reasoning service HTTP 401: unauthorized"));
        assert!(!is_transient_error("reasoning service HTTP 400: bad request"));
        assert!(!is_transient_error("some random error"));
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let service = FnService::new(|prompt| {
            if CALLS.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("reasoning service HTTP 503: unavailable".to_string())
            } else {
                Ok(format!("done: {prompt}"))
            }
        });
        let config = RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let retrying = Retrying::new(service, config);

        let out = retrying.complete("task").await.unwrap();
        assert_eq!(out, "done: task");
        assert_eq!(CALLS.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_fails_immediately() {
        let service = FnService::new(|_| Err("reasoning service HTTP 401: unauthorized".into()));
        let retrying = Retrying::new(service, RetryConfig::with_retries(5));

        let err = retrying.complete("task").await.unwrap_err();
        assert!(err.contains("HTTP 401"));
    }

    #[tokio::test]
    async fn zero_retries_preserves_fail_fast() {
        static CALLS: AtomicU32 = AtomicU32::new(0);
        let service = FnService::new(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Err("reasoning service HTTP 503: unavailable".to_string())
        });
        let retrying = Retrying::new(service, RetryConfig::default());

        assert!(retrying.complete("task").await.is_err());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
