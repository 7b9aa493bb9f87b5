//! Bounded retry with exponential backoff
//!
//! Only transient store failures are retried; permanent ones (bad
//! credentials, constraint violations) return immediately.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::store::{StoreError, StoreErrorKind};

/// Retry schedule for store operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Backoff delay after the given zero-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op`, retrying transient store errors per `policy`
///
/// Returns the first permanent error unchanged, or the last transient
/// error once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e)
                if e.kind() == StoreErrorKind::Transient && attempt + 1 < policy.max_attempts =>
            {
                let delay = policy.delay_for(attempt);
                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "transient store error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
