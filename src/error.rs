//! Crate-level error type.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::config::{ConfigError, DescriptorError};
use crate::lifecycle::StartupError;
use crate::routing::TopicError;

/// Errors surfaced by the module runtime.
///
/// Construction errors (descriptor, config, broker) are fatal: the module
/// never becomes operative.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid broker client: {0}")]
    InvalidBroker(String),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for runtime operations.
pub type ModuleResult<T> = Result<T, ModuleError>;
