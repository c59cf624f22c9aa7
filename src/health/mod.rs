//! Liveness reporting subsystem.
//!
//! # Data Flow
//! ```text
//! start {aliveTimeout}
//!     → heartbeat.rs (cancel previous task, spawn new one)
//!     → every period: {status, lastSeen, data?} → <self>/msg/core/alive
//!
//! shutdown
//!     → heartbeat.rs (cancel, wait for the task to exit)
//! ```
//!
//! # Design Decisions
//! - One heartbeat per module, never two in flight
//! - Ticks are isolated units of work
//! - Status is read from the lifecycle cell at tick time

pub mod heartbeat;

pub use heartbeat::{AliveDataFn, AliveHandle, HeartbeatScheduler};
