//! Structured logging.
//!
//! Uses the tracing crate with an `EnvFilter`: `RUST_LOG` wins, otherwise the
//! configured level applies to this crate and tower-http. The subscriber is
//! installed before the configuration is read, so load-time warnings are
//! kept; the configured level is applied afterwards through a reload handle.

use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Adjusts the level of an installed subscriber.
pub struct LogLevelHandle {
    inner: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogLevelHandle {
    /// Switch to `level` for this crate and tower-http. No-op when the
    /// filter came from `RUST_LOG`.
    pub fn set_level(&self, level: &str) {
        let Some(handle) = &self.inner else {
            return;
        };
        if let Err(e) = handle.reload(level_filter(level)) {
            tracing::warn!(error = %e, level, "Failed to apply configured log level");
        }
    }
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("gateway_core={level},tower_http={level}"))
}

/// Wrap `filter` so it can be replaced later.
pub fn reloadable_filter(
    filter: EnvFilter,
    from_env: bool,
) -> (reload::Layer<EnvFilter, Registry>, LogLevelHandle) {
    let (layer, handle) = reload::Layer::new(filter);
    let inner = if from_env { None } else { Some(handle) };
    (layer, LogLevelHandle { inner })
}

/// Install the global tracing subscriber at `initial_level`. Safe to call
/// more than once; later calls are ignored.
pub fn init_logging(initial_level: &str) -> LogLevelHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (level_filter(initial_level), false),
    };
    let (filter, handle) = reloadable_filter(filter, from_env);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    handle
}
