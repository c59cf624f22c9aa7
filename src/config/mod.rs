//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! runtime.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RuntimeConfig (validated, immutable)
//!
//! descriptor (module.json / YAML, or a parsed document)
//!     → descriptor.rs (resolve path, parse, check mapping + name)
//!     → ModuleIdentity
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The descriptor is identity, the runtime config is behaviour

pub mod descriptor;
pub mod loader;
pub mod schema;
pub mod validation;

pub use descriptor::{load_descriptor, resolve_descriptor_path, DescriptorError, ModuleIdentity};
pub use loader::{load_config, ConfigError};
pub use schema::{
    ConnectConfig, HeartbeatConfig, LoggingConfig, ObservabilityConfig, RuntimeConfig,
    ShutdownConfig,
};
