//! Retry with exponential back-off and jitter for the places client.
//!
//! Transient failures (429, connect errors, timeouts, 5xx) are retried;
//! authentication, not-found and parse failures are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Upper bound on a single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` is worth retrying after a back-off delay.
///
/// Retriable:
/// - [`ScraperError::RateLimited`]: HTTP 429.
/// - [`ScraperError::Http`]: timeout or connection failure.
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } => true,
        ScraperError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ScraperError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        ScraperError::Deserialize { .. }
        | ScraperError::Unauthorized { .. }
        | ScraperError::NotFound { .. }
        | ScraperError::InvalidBaseUrl { .. } => false,
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at 60 s, then scaled by a ±25 % jitter factor.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// With `backoff_base_ms = 1_000` the sleeps are roughly 1 s, 2 s, 4 s (±25 %).
/// A 429 that names a `Retry-After` longer than the computed delay waits at
/// least that long, still capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let mut delay_ms = backoff_delay_ms(backoff_base_ms, attempt);
                if let ScraperError::RateLimited {
                    retry_after_secs, ..
                } = &err
                {
                    delay_ms = delay_ms.max(retry_after_secs.saturating_mul(1000).min(MAX_DELAY_MS));
                }
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient source API error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
