//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     connect (retry per policy) → register actions → subscribe → "ready"
//!
//! Transitions (state.rs, hooks.rs):
//!     start:   hook → Running → heartbeat(aliveTimeout)
//!     stop:    hook → Stopped
//!     restart: stop, then start
//!
//! Shutdown (shutdown.rs):
//!     cancel heartbeat → hook → status to core → pause → disconnect → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown handshake
//! ```
//!
//! # Design Decisions
//! - Hooks fire before bookkeeping; bookkeeping runs regardless
//! - Lifecycle state is atomic and observable
//! - Shutdown never aborts half way

pub mod hooks;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use hooks::{Hook, HookError, HookKind, HookOutcome, HookResult, HookTable};
pub use shutdown::{ExitHandler, Shutdown, ShutdownStatus};
pub use startup::StartupError;
pub use state::{LifecycleCell, LifecycleState};
