//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and the
//! production secret policy. Every problem is reported, not just the first.

use std::collections::HashSet;

use crate::config::schema::{Environment, GatewayConfig, DEV_ACCESS_SECRET, DEV_REFRESH_SECRET};
use crate::tokens::expiry::parse_expiry_strict;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("breaker.error_threshold_percentage must be within 0-100, got {0}")]
    ThresholdOutOfRange(u32),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("{0} must not be empty")]
    EmptySecret(&'static str),
    #[error("production requires proper JWT secrets to be set ({0} uses the development default)")]
    DevelopmentSecretInProduction(&'static str),
    #[error("duplicate downstream service name: {0}")]
    DuplicateService(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let breaker = &config.breaker;
    if breaker.error_threshold_percentage > 100 {
        errors.push(ValidationError::ThresholdOutOfRange(
            breaker.error_threshold_percentage,
        ));
    }
    for (name, value) in [
        ("breaker.timeout_ms", breaker.timeout_ms),
        ("breaker.reset_timeout_ms", breaker.reset_timeout_ms),
        ("breaker.monitoring_period_ms", breaker.monitoring_period_ms),
        ("auth.sweep_interval_secs", config.auth.sweep_interval_secs),
        ("health_check.interval_secs", config.health_check.interval_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(name));
        }
    }

    let auth = &config.auth;
    if auth.access_token_secret.is_empty() {
        errors.push(ValidationError::EmptySecret("auth.access_token_secret"));
    }
    if auth.refresh_token_secret.is_empty() {
        errors.push(ValidationError::EmptySecret("auth.refresh_token_secret"));
    }
    if config.environment == Environment::Production {
        if auth.access_token_secret == DEV_ACCESS_SECRET {
            errors.push(ValidationError::DevelopmentSecretInProduction("JWT_SECRET"));
        }
        if auth.refresh_token_secret == DEV_REFRESH_SECRET {
            errors.push(ValidationError::DevelopmentSecretInProduction(
                "JWT_REFRESH_SECRET",
            ));
        }
    }

    // Malformed lifetimes fall back to 15 minutes at issue time; surface them here.
    for (name, value) in [
        ("auth.access_token_expiry", &auth.access_token_expiry),
        ("auth.refresh_token_expiry", &auth.refresh_token_expiry),
    ] {
        if parse_expiry_strict(value).is_none() {
            tracing::warn!(
                field = name,
                value = %value,
                "Unrecognized token lifetime, falling back to 15 minutes"
            );
        }
    }

    let mut seen = HashSet::new();
    for service in &config.services {
        if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
