//! Timeout enforcement for a single attempt.
//!
//! The attempt future is raced against a Tokio timer. When the timer wins the
//! future is dropped, which cancels the in-flight downstream call instead of
//! leaving it running in the background.

use std::future::Future;
use std::time::Duration;

use crate::resilience::error::{DownstreamError, ResilienceError};

/// Run one attempt against `service`, classifying its outcome.
pub async fn run_attempt<T, Fut>(
    service: &str,
    timeout: Duration,
    attempt: Fut,
) -> Result<T, ResilienceError>
where
    Fut: Future<Output = Result<T, DownstreamError>>,
{
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ResilienceError::from_downstream(service, e)),
        Err(_) => Err(ResilienceError::Timeout {
            service: service.to_string(),
            timeout,
        }),
    }
}
