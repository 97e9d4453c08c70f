//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::{Environment, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document into a config, filling in defaults.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so callers can supply their own source.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("GATEWAY_ENV") {
        match Environment::parse(&value) {
            Some(env) => config.environment = env,
            None => tracing::warn!(value = %value, "Ignoring unknown GATEWAY_ENV"),
        }
    }
    if let Some(value) = lookup("GATEWAY_ADMIN_ADDR") {
        config.admin.bind_address = value;
    }

    if let Some(value) = lookup("JWT_SECRET") {
        config.auth.access_token_secret = value;
    }
    if let Some(value) = lookup("JWT_REFRESH_SECRET") {
        config.auth.refresh_token_secret = value;
    }
    if let Some(value) = lookup("JWT_EXPIRY") {
        config.auth.access_token_expiry = value;
    }
    if let Some(value) = lookup("JWT_REFRESH_EXPIRY") {
        config.auth.refresh_token_expiry = value;
    }

    override_number(&lookup, "CB_TIMEOUT_MS", &mut config.breaker.timeout_ms);
    override_number(
        &lookup,
        "CB_ERROR_THRESHOLD_PERCENTAGE",
        &mut config.breaker.error_threshold_percentage,
    );
    override_number(&lookup, "CB_RESET_TIMEOUT_MS", &mut config.breaker.reset_timeout_ms);
    override_number(
        &lookup,
        "CB_MONITORING_PERIOD_MS",
        &mut config.breaker.monitoring_period_ms,
    );
    override_number(&lookup, "RETRY_MAX_RETRIES", &mut config.retries.max_retries);
}

fn override_number<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable numeric override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [breaker]
            error_threshold_percentage = 75

            [[services]]
            name = "orders"
            base_url = "http://localhost:4003"
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.error_threshold_percentage, 75);
        assert_eq!(config.breaker.timeout_ms, 5_000);
        assert_eq!(config.services[0].health_url(), "http://localhost:4003/health");
        assert_eq!(config.auth.refresh_token_expiry, "7d");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("GATEWAY_ENV", "production"),
                ("JWT_SECRET", "a"),
                ("JWT_REFRESH_EXPIRY", "30d"),
                ("CB_RESET_TIMEOUT_MS", "1000"),
                ("RETRY_MAX_RETRIES", "not-a-number"),
            ]),
        );

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.auth.access_token_secret, "a");
        assert_eq!(config.auth.refresh_token_expiry, "30d");
        assert_eq!(config.breaker.reset_timeout_ms, 1000);
        assert_eq!(config.retries.max_retries, 3);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = parse_config("breaker = 12").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
