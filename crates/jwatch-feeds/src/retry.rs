//! Retry with exponential back-off for feed requests.
//!
//! Only transient server-side statuses (see [`FetchError::RETRY_STATUSES`])
//! are retried. Everything else, including 403 and 404, is returned on the
//! first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Runs `operation` up to `max_attempts` times in total.
///
/// Back-off schedule with `backoff_base = 1s`:
///
/// | Attempt | Sleep before next attempt |
/// |---------|---------------------------|
/// | 1       | 1 s × 2⁰ = 1 s            |
/// | 2       | 1 s × 2¹ = 2 s            |
/// | 3       | none, last error returned |
///
/// `max_attempts = 0` is treated as 1.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base: Duration,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = backoff_base.saturating_mul(1u32 << (attempt - 1).min(16));
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient feed error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
