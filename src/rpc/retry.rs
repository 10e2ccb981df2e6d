//! Bounded exponential-backoff retry for remote calls

use crate::config::Settings;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Retries rate-limited and transient failures with doubling delays.
///
/// Fatal errors (anything [`crate::Error::is_retryable`] rejects) are returned
/// on the first occurrence. After `max_retries` additional attempts the last
/// error is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitedRetrier {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RateLimitedRetrier {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(2000))
    }
}

impl RateLimitedRetrier {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_retries, settings.retry_base_delay())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry `attempt` (1-indexed): `base * 2^(attempt-1)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails fatally, or retries run out
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        "{}: {} - retrying in {}ms (attempt {}/{})",
                        label,
                        e,
                        delay.as_millis(),
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
