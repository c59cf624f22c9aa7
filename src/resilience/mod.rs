//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Broker connect during setup:
//!     → retries.rs (policy: bounded or unbounded attempts)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Unbounded retry is the default; bounding it is the caller's choice
//! - Jittered backoff prevents a fleet of modules reconnecting in lockstep
//! - Reconnects after an established session are the broker client's job

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
