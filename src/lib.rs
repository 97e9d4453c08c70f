//! Resilient gateway core: per-service circuit breakers with retries for
//! outbound calls, and access/refresh token issuance with single-use rotation.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod tokens;

pub use config::GatewayConfig;
pub use lifecycle::{GatewayCore, Shutdown};
pub use resilience::{ResilienceError, ResilientExecutor};
pub use tokens::{TokenPair, TokenService};
