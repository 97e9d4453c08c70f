//! Cancellable background schedules.
//!
//! Every recurring job in the gateway core (breaker decay, refresh token
//! sweep) is a [`ScheduledTask`] owned by whoever started it. Cancelling or
//! dropping the task stops the schedule; no callback outlives its owner.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Handle to a recurring job running on the Tokio runtime.
#[derive(Debug)]
pub struct ScheduledTask {
    name: String,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `tick` every `period`, first firing one period from now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn every<F>(name: impl Into<String>, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::trace!(task = %task_name, "Scheduled task tick");
                tick();
            }
        });

        Self { name, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the schedule. Idempotent.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            tracing::debug!(task = %self.name, "Cancelling scheduled task");
        }
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
