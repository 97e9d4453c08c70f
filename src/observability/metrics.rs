//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_breaker_transitions_total` (counter): by service, target state
//! - `gateway_breaker_rejections_total` (counter): calls refused while open
//! - `gateway_downstream_calls_total` (counter): by service, outcome
//! - `gateway_retries_total` (counter): retry attempts by service
//! - `gateway_token_events_total` (counter): issue/rotate/revoke/sweep
//! - `gateway_refresh_tokens` (gauge): live records by state
//! - `gateway_service_health` (gauge): 1 when the last probe succeeded
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_breaker_transition(service: &str, state: &'static str) {
    counter!(
        "gateway_breaker_transitions_total",
        "service" => service.to_string(),
        "state" => state
    )
    .increment(1);
}

pub fn record_breaker_rejection(service: &str) {
    counter!("gateway_breaker_rejections_total", "service" => service.to_string()).increment(1);
}

pub fn record_downstream_call(service: &str, outcome: &'static str) {
    counter!(
        "gateway_downstream_calls_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_retry(service: &str) {
    counter!("gateway_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_token_event(event: &'static str, count: u64) {
    counter!("gateway_token_events_total", "event" => event).increment(count);
}

pub fn record_refresh_tokens(active: usize, expired: usize) {
    gauge!("gateway_refresh_tokens", "state" => "active").set(active as f64);
    gauge!("gateway_refresh_tokens", "state" => "expired").set(expired as f64);
}

pub fn record_service_health(service: &str, healthy: bool) {
    gauge!("gateway_service_health", "service" => service.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
