//! Active health polling of downstream services.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::{HealthCheckConfig, ServiceConfig};
use crate::observability::metrics;
use crate::resilience::{check_status, DownstreamError, ResilienceError, ResilientExecutor};

pub struct HealthMonitor {
    executor: Arc<ResilientExecutor>,
    services: Vec<ServiceConfig>,
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(
        executor: Arc<ResilientExecutor>,
        services: Vec<ServiceConfig>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            executor,
            services,
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled || self.services.is_empty() {
            tracing::info!("Health polling disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            services = self.services.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every service once. Returns `(name, healthy)` pairs in
    /// configuration order.
    pub async fn check_all(&self) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(self.services.len());

        for service in &self.services {
            let healthy = match self.check_service(service).await {
                Ok(()) => true,
                Err(e) if e.is_admission_rejected() => {
                    tracing::debug!(service = %service.name, "Health probe skipped: circuit open");
                    false
                }
                Err(e) => {
                    tracing::warn!(service = %service.name, error = %e, "Health check failed");
                    false
                }
            };

            metrics::record_service_health(&service.name, healthy);
            results.push((service.name.clone(), healthy));
        }

        results
    }

    async fn check_service(&self, service: &ServiceConfig) -> Result<(), ResilienceError> {
        let url = service.health_url();
        self.executor
            .execute_with_retries(
                &service.name,
                || async {
                    check_status(self.client.get(&url).send().await?).await?;
                    Ok::<(), DownstreamError>(())
                },
                0,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    use crate::config::{BreakerConfig, RetryConfig};

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn service(name: &str, base_url: String) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            base_url,
            health_path: "/health".into(),
        }
    }

    #[tokio::test]
    async fn test_check_all_reports_each_service() {
        let up = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        let down = serve(Router::new().route(
            "/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let executor = Arc::new(ResilientExecutor::new(
            BreakerConfig::default(),
            RetryConfig::default(),
        ));
        let monitor = HealthMonitor::new(
            executor.clone(),
            vec![service("users", up), service("orders", down)],
            HealthCheckConfig::default(),
        );

        let results = monitor.check_all().await;
        assert_eq!(
            results,
            vec![("users".to_string(), true), ("orders".to_string(), false)]
        );

        // Single-attempt probes share the service breakers.
        let status = executor.status();
        assert_eq!(status["users"].successes, 1);
        assert_eq!(status["orders"].failures, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let up = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        let executor = Arc::new(ResilientExecutor::new(
            BreakerConfig::default(),
            RetryConfig::default(),
        ));
        let monitor = HealthMonitor::new(
            executor,
            vec![service("users", up)],
            HealthCheckConfig {
                enabled: true,
                interval_secs: 3600,
            },
        );

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run(rx));
        tx.send(()).unwrap();

        time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("monitor exits")
            .unwrap();
    }
}
