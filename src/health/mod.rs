//! Downstream health polling.
//!
//! # Data Flow
//! ```text
//! Periodic timer
//!     → GET <base_url><health_path> for each configured service
//!     → through the resilient executor, single attempt
//!     → log + gauge per service
//! ```
//!
//! Probes share the per-service breaker with regular traffic, so a failing
//! service also shows up as an OPEN breaker in the admin status.

pub mod active;

pub use active::HealthMonitor;
