//! Module runtime library.
//!
//! Attaches a module to a central core over a publish/subscribe broker:
//! topic addressing, action routing, lifecycle with hooks, heartbeat,
//! shutdown handshake, log fan-out and descriptor ingestion.

pub mod broker;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod runtime;

pub use broker::{BrokerClient, LocalBroker, LocalBus, QoS};
pub use config::{ModuleIdentity, RuntimeConfig};
pub use error::{ModuleError, ModuleResult};
pub use lifecycle::{HookKind, LifecycleState, ShutdownStatus};
pub use observability::{FanoutLogger, Severity};
pub use routing::{action_handler, Packet, Payload, Topic};
pub use runtime::{Module, ModuleBuilder};
