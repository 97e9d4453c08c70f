//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway core.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Signing secret used when `JWT_SECRET` is not provided.
pub const DEV_ACCESS_SECRET: &str = "dev-access-secret";

/// Signing secret used when `JWT_REFRESH_SECRET` is not provided.
pub const DEV_REFRESH_SECRET: &str = "dev-refresh-secret";

/// Root configuration for the gateway core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment environment.
    pub environment: Environment,

    /// Admin listener configuration.
    pub admin: AdminConfig,

    /// Circuit breaker defaults shared by every downstream service.
    pub breaker: BreakerConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Token issuance settings.
    pub auth: AuthConfig,

    /// Downstream services polled by the health monitor.
    pub services: Vec<ServiceConfig>,

    /// Health polling settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name, accepting the common short forms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

/// Admin listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin router.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Request timeout for admin endpoints in seconds.
    pub request_timeout_secs: u64,

    /// Role required to read `/admin/status`.
    pub status_role: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 10,
            status_role: "admin".to_string(),
        }
    }
}

/// Circuit breaker configuration, inherited by each per-service breaker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Per-attempt operation timeout in milliseconds.
    pub timeout_ms: u64,

    /// Error percentage (0-100) at which the breaker opens.
    pub error_threshold_percentage: u32,

    /// Time the breaker stays open before admitting a probe, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Counter decay period in milliseconds.
    pub monitoring_period_ms: u64,
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn monitoring_period(&self) -> Duration {
        Duration::from_millis(self.monitoring_period_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            error_threshold_percentage: 50,
            reset_timeout_ms: 30_000,
            monitoring_period_ms: 60_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Default number of retries after the initial attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
        }
    }
}

/// Token issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub access_token_secret: String,

    /// HMAC secret for refresh tokens.
    pub refresh_token_secret: String,

    /// Access token lifetime (e.g., "15m").
    pub access_token_expiry: String,

    /// Refresh token lifetime (e.g., "7d").
    pub refresh_token_expiry: String,

    /// Expired refresh token sweep interval in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_token_secret: DEV_REFRESH_SECRET.to_string(),
            access_token_expiry: "15m".to_string(),
            refresh_token_expiry: "7d".to_string(),
            sweep_interval_secs: 60 * 60,
        }
    }
}

/// A downstream service the gateway talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name; also the circuit breaker key.
    pub name: String,

    /// Base URL (e.g., "http://localhost:4003").
    pub base_url: String,

    /// Path to probe for health checks.
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl ServiceConfig {
    pub fn health_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.health_path
        )
    }
}

fn default_health_path() -> String {
    "/health".to_string()
}

/// Health polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable periodic health polling.
    pub enabled: bool,

    /// Polling interval in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
