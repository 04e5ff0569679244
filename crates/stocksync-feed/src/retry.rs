//! Bounded exponential backoff for feed downloads.
//!
//! Network failures, HTTP 429 and 5xx responses are retried. Everything else
//! (404, 403, an empty body) would fail the same way again and is returned
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

fn is_retriable(err: &FeedError) -> bool {
    match err {
        FeedError::Http(_) => true,
        FeedError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
        FeedError::EmptyBody { .. }
        | FeedError::Timeout { .. }
        | FeedError::InvalidUrl { .. } => false,
    }
}

/// Runs `operation`, retrying transient errors up to `max_retries` extra
/// times with a delay of `backoff_base_secs * 2^attempt` seconds between
/// attempts. The last error is returned once retries run out.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient feed error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
