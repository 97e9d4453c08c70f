//! Resilient request executor.
//!
//! One logical outbound call = one breaker admission + a bounded retry loop.
//!
//! ```text
//! execute(service, op, max_retries)
//!     → breaker(service).try_acquire()      (reject fast when OPEN)
//!     → attempt 0..=max_retries
//!         → timeouts::run_attempt           (per-attempt deadline)
//!         → client error? stop
//!         → else sleep backoff(attempt) and retry
//!     → breaker records the single final outcome
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;

use crate::config::{BreakerConfig, RetryConfig};
use crate::lifecycle::tasks::ScheduledTask;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker};
use crate::resilience::downstream::check_status;
use crate::resilience::error::{DownstreamError, ErrorKind, ResilienceError};
use crate::resilience::timeouts::run_attempt;

struct BreakerEntry {
    breaker: Arc<CircuitBreaker>,
    // Dropping the entry stops the decay schedule.
    _decay: ScheduledTask,
}

/// Executes outbound operations behind lazily created per-service breakers.
pub struct ResilientExecutor {
    breaker_config: BreakerConfig,
    retry_config: RetryConfig,
    breakers: DashMap<String, BreakerEntry>,
}

impl ResilientExecutor {
    pub fn new(breaker_config: BreakerConfig, retry_config: RetryConfig) -> Self {
        Self {
            breaker_config,
            retry_config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `service`, created (with its decay task) on first use.
    pub fn breaker(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(entry) = self.breakers.get(service) {
            return entry.breaker.clone();
        }

        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(service, "Creating circuit breaker");
                let breaker = Arc::new(CircuitBreaker::new(service, self.breaker_config.clone()));
                let decay = breaker.spawn_decay();
                BreakerEntry {
                    breaker,
                    _decay: decay,
                }
            })
            .breaker
            .clone()
    }

    /// Execute with the configured default retry count.
    pub async fn execute<F, Fut, T>(&self, service: &str, operation: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownstreamError>>,
    {
        self.execute_with_retries(service, operation, self.retry_config.max_retries)
            .await
    }

    /// Execute `operation` against `service` with at most `max_retries`
    /// retries after the first attempt. `max_retries = 0` means a single
    /// fail-fast attempt.
    pub async fn execute_with_retries<F, Fut, T>(
        &self,
        service: &str,
        operation: F,
        max_retries: u32,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownstreamError>>,
    {
        let breaker = self.breaker(service);
        let result = breaker
            .call(|| self.run_attempts(service, operation, max_retries))
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.reason_code(),
        };
        metrics::record_downstream_call(service, outcome);
        result
    }

    async fn run_attempts<F, Fut, T>(
        &self,
        service: &str,
        mut operation: F,
        max_retries: u32,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownstreamError>>,
    {
        let timeout = self.breaker_config.timeout();
        let mut retry = 0;

        loop {
            let err = match run_attempt(service, timeout, operation()).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.kind() == ErrorKind::ClientError {
                return Err(err);
            }

            if retry >= max_retries {
                if retry == 0 {
                    return Err(err);
                }
                tracing::warn!(service, attempts = retry + 1, error = %err, "Retries exhausted");
                return Err(ResilienceError::RetriesExhausted {
                    service: service.to_string(),
                    attempts: retry + 1,
                    last: Box::new(err),
                });
            }

            retry += 1;
            let delay = calculate_backoff(
                retry,
                self.retry_config.base_delay_ms,
                self.retry_config.max_delay_ms,
            );
            tracing::info!(service, attempt = retry, delay = ?delay, error = %err, "Retrying request");
            metrics::record_retry(service);
            tokio::time::sleep(delay).await;
        }
    }

    /// GET `url` and decode a JSON body, with breaker and retries for `service`.
    pub async fn get_json<T>(
        &self,
        client: &reqwest::Client,
        service: &str,
        url: &str,
        max_retries: u32,
    ) -> Result<T, ResilienceError>
    where
        T: DeserializeOwned,
    {
        self.execute_with_retries(
            service,
            move || async move {
                let response = check_status(client.get(url).send().await?).await?;
                Ok::<T, DownstreamError>(response.json::<T>().await?)
            },
            max_retries,
        )
        .await
    }

    /// Snapshot of every breaker, keyed by service name.
    pub fn status(&self) -> BTreeMap<String, BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().breaker.snapshot()))
            .collect()
    }

    /// Drop every breaker and stop their decay schedules.
    pub fn shutdown(&self) {
        let count = self.breakers.len();
        self.breakers.clear();
        tracing::info!(breakers = count, "Resilient executor shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::resilience::circuit_breaker::CircuitState;

    fn executor(threshold: u32) -> ResilientExecutor {
        ResilientExecutor::new(
            BreakerConfig {
                timeout_ms: 5_000,
                error_threshold_percentage: threshold,
                reset_timeout_ms: 30_000,
                monitoring_period_ms: 60_000,
            },
            RetryConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let exec = executor(100);
        let calls = AtomicU32::new(0);

        let err = exec
            .execute_with_retries(
                "users",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(DownstreamError::from_status(404, "missing"))
                },
                3,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_back_off_then_exhaust() {
        let exec = executor(100);
        let started = Instant::now();
        let attempts_at = parking_lot::Mutex::new(Vec::new());

        let err = exec
            .execute(
                "orders",
                || async {
                    attempts_at.lock().push(started.elapsed().as_millis());
                    Err::<(), _>(DownstreamError::from_status(503, "unavailable"))
                },
            )
            .await
            .unwrap_err();

        assert_eq!(*attempts_at.lock(), vec![0, 1_000, 3_000, 7_000]);
        match err {
            ResilienceError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 4);
                assert_eq!(last.kind(), ErrorKind::TransientFailure);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_call_counts_as_one_success() {
        let exec = executor(50);
        let calls = AtomicU32::new(0);

        let value = exec
            .execute("orders", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DownstreamError::transport("connection reset"))
                } else {
                    Ok("done")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "done");
        let status = exec.status();
        assert_eq!(status["orders"].state, CircuitState::Closed);
        assert_eq!(status["orders"].successes, 1);
        assert_eq!(status["orders"].failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_fails_fast() {
        let exec = executor(100);
        let calls = AtomicU32::new(0);

        let err = exec
            .execute_with_retries(
                "geo",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(DownstreamError::from_status(500, ""))
                },
                0,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransientFailure);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried() {
        let exec = executor(100);
        let calls = AtomicU32::new(0);

        let value = exec
            .execute_with_retries(
                "geo",
                || async {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok::<_, DownstreamError>(1)
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_orders_scenario() {
        let exec = executor(50);
        let calls = AtomicU32::new(0);
        let failing = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(DownstreamError::from_status(502, ""))
        };

        let first = exec.execute_with_retries("orders", failing, 0).await;
        assert!(first.is_err());
        let _ = exec.execute_with_retries("orders", failing, 0).await;
        assert_eq!(exec.breaker("orders").state(), CircuitState::Open);

        let third = exec.execute_with_retries("orders", failing, 0).await;
        assert!(third.unwrap_err().is_admission_rejected());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        let probe = exec
            .execute_with_retries("orders", || async { Ok::<_, DownstreamError>(()) }, 0)
            .await;
        assert!(probe.is_ok());
        assert_eq!(exec.breaker("orders").state(), CircuitState::Closed);

        let after = exec
            .execute_with_retries("orders", || async { Ok::<_, DownstreamError>(()) }, 0)
            .await;
        assert!(after.is_ok());
    }

    #[tokio::test]
    async fn test_breakers_are_per_service_and_shut_down() {
        let exec = executor(50);
        let _ = exec
            .execute_with_retries("users", || async { Err::<(), _>(DownstreamError::from_status(500, "")) }, 0)
            .await;
        let _ = exec
            .execute_with_retries("geo", || async { Ok::<_, DownstreamError>(()) }, 0)
            .await;

        let status = exec.status();
        assert_eq!(status["users"].state, CircuitState::Open);
        assert_eq!(status["geo"].state, CircuitState::Closed);
        assert!(Arc::ptr_eq(&exec.breaker("geo"), &exec.breaker("geo")));

        exec.shutdown();
        assert!(exec.status().is_empty());
    }
}
