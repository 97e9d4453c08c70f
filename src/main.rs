//! Gateway core process.
//!
//! ```text
//! config (TOML + env) → logging/metrics → GatewayCore::start
//!     → HealthMonitor (background)  → admin router (axum)
//! SIGINT/SIGTERM → Shutdown broadcast → drain admin → core.shutdown()
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use gateway_core::admin::admin_router;
use gateway_core::config::load_config;
use gateway_core::health::HealthMonitor;
use gateway_core::lifecycle::{wait_for_shutdown_signal, GatewayCore, Shutdown};
use gateway_core::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "gateway-core")]
#[command(about = "Resilient gateway core: circuit breakers, retries and token rotation")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = logging::init_logging("info");
    let config = load_config(args.config.as_deref())?;
    log_level.set_level(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gateway-core starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let core = Arc::new(GatewayCore::start(config.clone()));
    let shutdown = Shutdown::new();

    let monitor = HealthMonitor::new(
        core.executor().clone(),
        config.services.clone(),
        config.health_check.clone(),
    );
    let monitor_handle = tokio::spawn(monitor.run(shutdown.subscribe()));

    let admin_handle = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let app = admin_router(core.clone());
        let signalled = shutdown.signalled();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signalled)
                .await
        }))
    } else {
        None
    };

    wait_for_shutdown_signal().await;
    shutdown.trigger();

    if let Some(handle) = admin_handle {
        match handle.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin server error"),
            Err(e) => tracing::error!(error = %e, "Admin server task failed"),
            Ok(Ok(())) => {}
        }
    }
    let _ = monitor_handle.await;
    core.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}
