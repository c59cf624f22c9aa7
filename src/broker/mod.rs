//! Broker collaborator subsystem.
//!
//! # Data Flow
//! ```text
//! Runtime
//!     → client.rs (BrokerClient trait: connect, publish, subscribe, callbacks)
//!     → concrete client (local.rs in-process bus, or an embedder's MQTT client)
//!
//! Inbound:
//!     broker delivery task
//!     → topic callback registered by the action router
//! ```
//!
//! # Design Decisions
//! - The runtime only sees the trait; wire protocol stays with the client
//! - Publish/subscribe are synchronous and must not block on the network
//! - Callbacks are async and run one at a time per client

pub mod client;
pub mod local;

pub use client::{BrokerClient, BrokerError, Message, QoS, TopicCallback};
pub use local::{LocalBroker, LocalBus};
