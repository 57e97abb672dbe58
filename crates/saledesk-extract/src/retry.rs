//! Exponential back-off with jitter for language-model API calls.
//!
//! Only transient conditions are retried. Credential failures, parse errors
//! and validation errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ExtractError;

const MAX_DELAY_MS: u64 = 60_000;

fn is_retriable(err: &ExtractError) -> bool {
    match err {
        ExtractError::RateLimited { .. } => true,
        ExtractError::UnexpectedStatus { status, .. } => *status >= 500,
        ExtractError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

/// Wait before the retry numbered `retry` (1-based), given the error that
/// triggered it. `jitter` scales the doubled base delay and is expected in
/// `0.75..1.25`. A rate-limit `Retry-After` acts as a lower bound. Both are
/// capped at [`MAX_DELAY_MS`].
fn backoff_delay(retry: u32, backoff_base_ms: u64, jitter: f64, err: &ExtractError) -> Duration {
    let doubled = backoff_base_ms
        .saturating_mul(1u64 << retry.saturating_sub(1).min(10))
        .min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let scaled = (doubled as f64 * jitter) as u64;
    let floor_ms = match err {
        ExtractError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.saturating_mul(1000).min(MAX_DELAY_MS),
        _ => 0,
    };
    Duration::from_millis(scaled.max(floor_ms))
}

/// Calls `operation` until it succeeds, fails with a non-transient error, or
/// `max_retries` retries have been spent.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ExtractError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtractError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) && retry < max_retries => err,
            Err(err) => return Err(err),
        };
        retry += 1;
        let delay = backoff_delay(
            retry,
            backoff_base_ms,
            0.75 + rand::random::<f64>() * 0.5,
            &err,
        );
        tracing::warn!(
            retry,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(MAX_DELAY_MS),
            error = %err,
            "model call failed transiently"
        );
        tokio::time::sleep(delay).await;
    }
}
