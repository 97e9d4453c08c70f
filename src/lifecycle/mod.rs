//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → executor + token service → sweep schedule
//!
//! Background work (tasks.rs):
//!     Breaker decay, refresh token sweep → owned ScheduledTask handles
//!
//! Shutdown (signals.rs → shutdown.rs):
//!     SIGTERM/SIGINT → broadcast to long-running loops → core.shutdown()
//! ```
//!
//! # Design Decisions
//! - Every timer belongs to a handle; shutdown cancels all of them
//! - Long-running loops (health polling, admin server) listen on the broadcast

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod tasks;

pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown_signal;
pub use startup::GatewayCore;
pub use tasks::ScheduledTask;
