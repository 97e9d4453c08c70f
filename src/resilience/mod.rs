//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call to a downstream service:
//!     → executor.rs (one logical call, lazily created breaker per service)
//!     → circuit_breaker.rs (admit or reject fast; one outcome per call)
//!     → timeouts.rs (per-attempt deadline, cancels the losing attempt)
//!     → backoff.rs (delay between retries)
//!     → error.rs (machine-readable failure taxonomy)
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breaker, not global
//! - Client errors (4xx) are never retried
//! - The breaker never sees individual attempts, only the final outcome

pub mod backoff;
pub mod circuit_breaker;
pub mod downstream;
pub mod error;
pub mod executor;
pub mod timeouts;

pub use circuit_breaker::{BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use downstream::check_status;
pub use error::{DownstreamError, ErrorKind, ResilienceError};
pub use executor::ResilientExecutor;
