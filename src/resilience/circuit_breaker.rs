//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: downstream assumed down, calls fail fast
//! - Half-Open: a single probe call tests whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: error percentage >= threshold
//! Open → Half-Open: first call at or after next_attempt_at
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (fresh next_attempt_at)
//! ```
//!
//! Counters are streaks: a success zeroes the failure count and a failure
//! zeroes the success count. Both are halved every monitoring period.
//!
//! Every trip to OPEN starts a new generation. A permit issued in an earlier
//! generation still feeds the counters when it settles but never changes the
//! state, so only the half-open probe decides how HALF_OPEN ends.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::lifecycle::tasks::ScheduledTask;
use crate::observability::metrics;
use crate::resilience::error::ResilienceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

/// Point-in-time view of a breaker, as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failures: u32,
    pub successes: u32,
}

struct BreakerState {
    current: CircuitState,
    failures: u32,
    successes: u32,
    /// Only meaningful while `current == Open`.
    next_attempt_at: Instant,
    probe_in_flight: bool,
    generation: u64,
}

/// Per-service circuit breaker.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState {
                current: CircuitState::Closed,
                failures: 0,
                successes: 0,
                next_attempt_at: Instant::now(),
                probe_in_flight: false,
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().current
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.lock();
        BreakerSnapshot {
            state: state.current,
            failures: state.failures,
            successes: state.successes,
        }
    }

    /// Run `f` if the breaker admits it, recording exactly one outcome.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let permit = self.try_acquire().ok_or_else(|| ResilienceError::AdmissionRejected {
            service: self.name.clone(),
        })?;

        let result = f().await;
        match &result {
            Ok(_) => permit.record_success(),
            Err(_) => permit.record_failure(),
        }
        result
    }

    /// Ask for admission. `None` means the call must be rejected without
    /// invoking the operation.
    pub fn try_acquire(&self) -> Option<BreakerPermit<'_>> {
        let mut state = self.state.lock();

        let current = state.current;
        let probe = match current {
            CircuitState::Closed => false,
            CircuitState::Open => {
                if Instant::now() < state.next_attempt_at {
                    drop(state);
                    metrics::record_breaker_rejection(&self.name);
                    return None;
                }
                state.current = CircuitState::HalfOpen;
                state.probe_in_flight = true;
                tracing::info!(service = %self.name, "Circuit breaker is now HALF_OPEN");
                metrics::record_breaker_transition(&self.name, CircuitState::HalfOpen.as_str());
                true
            }
            CircuitState::HalfOpen => {
                if state.probe_in_flight {
                    drop(state);
                    metrics::record_breaker_rejection(&self.name);
                    return None;
                }
                state.probe_in_flight = true;
                true
            }
        };

        Some(BreakerPermit {
            breaker: self,
            probe,
            generation: state.generation,
            settled: false,
        })
    }

    fn on_success(&self, probe: bool, generation: u64) {
        let mut state = self.state.lock();
        state.failures = 0;
        state.successes = state.successes.saturating_add(1);
        if !probe {
            return;
        }
        state.probe_in_flight = false;

        if generation == state.generation && state.current == CircuitState::HalfOpen {
            state.current = CircuitState::Closed;
            tracing::info!(service = %self.name, "Circuit breaker is now CLOSED");
            metrics::record_breaker_transition(&self.name, CircuitState::Closed.as_str());
        }
    }

    fn on_failure(&self, probe: bool, generation: u64) {
        let mut state = self.state.lock();
        state.failures = state.failures.saturating_add(1);
        state.successes = 0;
        if probe {
            state.probe_in_flight = false;
        }
        if generation != state.generation {
            return;
        }

        let total = u64::from(state.failures) + u64::from(state.successes);
        let error_pct = u64::from(state.failures) * 100 / total.max(1);
        let tripped = match state.current {
            CircuitState::Closed => {
                error_pct >= u64::from(self.config.error_threshold_percentage)
            }
            CircuitState::HalfOpen => probe,
            CircuitState::Open => false,
        };

        if tripped {
            state.current = CircuitState::Open;
            state.generation += 1;
            state.next_attempt_at = Instant::now() + self.config.reset_timeout();
            tracing::warn!(
                service = %self.name,
                failures = state.failures,
                error_pct,
                "Circuit breaker is now OPEN"
            );
            metrics::record_breaker_transition(&self.name, CircuitState::Open.as_str());
        }
    }

    fn release_probe(&self) {
        self.state.lock().probe_in_flight = false;
    }

    /// Halve both counters (integer floor).
    pub fn decay(&self) {
        let mut state = self.state.lock();
        state.failures /= 2;
        state.successes /= 2;
    }

    /// Start the periodic counter decay for this breaker.
    pub fn spawn_decay(self: &Arc<Self>) -> ScheduledTask {
        let breaker = Arc::clone(self);
        ScheduledTask::every(
            format!("breaker-decay:{}", self.name),
            self.config.monitoring_period(),
            move || breaker.decay(),
        )
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`].
///
/// Dropping a permit without recording an outcome (the call was cancelled)
/// frees the half-open probe slot and leaves the counters untouched.
#[must_use = "record the outcome of the admitted call"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    generation: u64,
    settled: bool,
}

impl BreakerPermit<'_> {
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe, self.generation);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe, self.generation);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::resilience::error::DownstreamError;

    fn config(threshold: u32) -> BreakerConfig {
        BreakerConfig {
            timeout_ms: 1_000,
            error_threshold_percentage: threshold,
            reset_timeout_ms: 30_000,
            monitoring_period_ms: 60_000,
        }
    }

    fn failure() -> Result<(), ResilienceError> {
        Err(ResilienceError::from_downstream(
            "orders",
            DownstreamError::from_status(503, ""),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_invoking() {
        let cb = CircuitBreaker::new("orders", config(50));
        let calls = AtomicU32::new(0);

        let _ = cb
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                failure()
            })
            .await;
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(result.unwrap_err().is_admission_rejected());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_success_closes() {
        let cb = CircuitBreaker::new("orders", config(50));
        let _ = cb.call(|| async { failure() }).await;

        tokio::time::advance(Duration::from_millis(29_999)).await;
        assert!(cb.try_acquire().is_none());

        tokio::time::advance(Duration::from_millis(1)).await;
        let result = cb.call(|| async { Ok::<_, ResilienceError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(cb.state(), CircuitState::Closed);

        // Admitted normally afterwards.
        assert!(cb.call(|| async { Ok::<_, ResilienceError>(()) }).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_reopens_with_fresh_deadline() {
        let cb = CircuitBreaker::new("orders", config(50));
        let _ = cb.call(|| async { failure() }).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        let _ = cb.call(|| async { failure() }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cb.try_acquire().is_none());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cb.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_probe_in_half_open() {
        let cb = CircuitBreaker::new("orders", config(50));
        let _ = cb.call(|| async { failure() }).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let probe = cb.try_acquire().expect("probe admitted");
        assert!(probe.is_probe());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.try_acquire().is_none());

        probe.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_from_before_trip_does_not_reopen() {
        let cb = CircuitBreaker::new("orders", config(50));
        let straggler = cb.try_acquire().expect("admitted while closed");
        let _ = cb.call(|| async { failure() }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        let probe = cb.try_acquire().expect("probe admitted");
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        straggler.record_failure();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.try_acquire().is_none());

        probe.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_from_before_trip_does_not_close() {
        let cb = CircuitBreaker::new("orders", config(50));
        let straggler = cb.try_acquire().expect("admitted while closed");
        let _ = cb.call(|| async { failure() }).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        let probe = cb.try_acquire().expect("probe admitted");

        straggler.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        probe.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.try_acquire().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_frees_slot() {
        let cb = CircuitBreaker::new("orders", config(50));
        let _ = cb.call(|| async { failure() }).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        drop(cb.try_acquire());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_streak_counters_reset_each_other() {
        let cb = CircuitBreaker::new("users", config(100));
        for _ in 0..3 {
            let _ = cb.call(|| async { Ok::<_, ResilienceError>(()) }).await;
        }
        assert_eq!(cb.snapshot().successes, 3);

        let _ = cb.call(|| async { failure() }).await;
        let snap = cb.snapshot();
        assert_eq!(snap.successes, 0);
        assert_eq!(snap.failures, 1);
        // A single failure after a success run is a 100% local error rate.
        assert_eq!(snap.state, CircuitState::Open);
    }

    #[test]
    fn test_decay_halves_counters() {
        let cb = CircuitBreaker::new("geo", config(100));
        for _ in 0..5 {
            cb.on_success(false, 0);
        }
        cb.decay();
        assert_eq!(cb.snapshot().successes, 2);
        cb.decay();
        cb.decay();
        assert_eq!(cb.snapshot().successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decay_task_runs_every_period() {
        let cb = Arc::new(CircuitBreaker::new("geo", config(100)));
        for _ in 0..8 {
            cb.on_success(false, 0);
        }
        let task = cb.spawn_decay();

        tokio::time::sleep(Duration::from_millis(60_001)).await;
        assert_eq!(cb.snapshot().successes, 4);

        task.cancel();
        tokio::time::sleep(Duration::from_millis(120_000)).await;
        assert_eq!(cb.snapshot().successes, 4);
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let cb = CircuitBreaker::new("orders", config(50));
        let json = serde_json::to_value(cb.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "CLOSED", "failures": 0, "successes": 0})
        );
    }
}
