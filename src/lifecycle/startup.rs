//! Startup orchestration.
//!
//! Builds the long-lived core services from a validated [`GatewayConfig`]
//! and owns their background schedules until [`GatewayCore::shutdown`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::GatewayConfig;
use crate::lifecycle::tasks::ScheduledTask;
use crate::resilience::ResilientExecutor;
use crate::tokens::{StaticUserDirectory, TokenService, UserDirectory};

/// Resilient executor and token service, plus the schedules they run.
pub struct GatewayCore {
    config: GatewayConfig,
    executor: Arc<ResilientExecutor>,
    tokens: Arc<TokenService>,
    sweeper: Mutex<Option<ScheduledTask>>,
}

impl GatewayCore {
    /// Start with the built-in user directory. Must be called from within a
    /// Tokio runtime.
    pub fn start(config: GatewayConfig) -> Self {
        Self::start_with_users(config, Arc::new(StaticUserDirectory))
    }

    pub fn start_with_users(config: GatewayConfig, users: Arc<dyn UserDirectory>) -> Self {
        let executor = Arc::new(ResilientExecutor::new(
            config.breaker.clone(),
            config.retries.clone(),
        ));
        let tokens = Arc::new(TokenService::new(&config.auth, users));
        let sweeper = tokens.spawn_sweeper();

        tracing::info!(
            environment = ?config.environment,
            services = config.services.len(),
            sweep_interval_secs = config.auth.sweep_interval_secs,
            "Gateway core started"
        );

        Self {
            config,
            executor,
            tokens,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<ResilientExecutor> {
        &self.executor
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Stop the token sweep and every breaker decay schedule. Idempotent.
    pub fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.cancel();
        }
        self.executor.shutdown();
        tracing::info!("Gateway core shut down");
    }
}
