//! Configuration schema definitions.
//!
//! This module defines the runtime configuration of a module process.
//! All types derive Serde traits for deserialization from TOML files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the module runtime.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Descriptor file location. Falls back to `module.json` next to the
    /// executable when unset.
    pub descriptor_path: Option<PathBuf>,

    /// Heartbeat settings.
    pub heartbeat: HeartbeatConfig,

    /// Broker connect policy.
    pub connect: ConnectConfig,

    /// Shutdown handshake settings.
    pub shutdown: ShutdownConfig,

    /// Module log stream settings.
    pub logging: LoggingConfig,

    /// Metrics settings.
    pub observability: ObservabilityConfig,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Interval used when `start` carries no `aliveTimeout`, in milliseconds.
    pub default_interval_ms: u64,

    /// Share of the period a single tick may take before it is abandoned.
    pub tick_timeout_ratio: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 1000,
            tick_timeout_ratio: 0.8,
        }
    }
}

/// Broker connect policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Maximum connect attempts during setup. `None` retries forever.
    pub max_attempts: Option<u32>,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Shutdown handshake configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Pause after the shutdown status publish, before disconnecting.
    pub publish_grace_ms: u64,

    /// Terminate the process when core sends `shutdown`.
    pub exit_process: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            publish_grace_ms: 50,
            exit_process: true,
        }
    }
}

/// Module log stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Initial severity threshold (debug, info, warn, error, fatal).
    pub level: String,

    /// Escape messages before they reach the sinks.
    pub escape: bool,

    /// Program name shown by the console sink. Defaults to the module name.
    pub progname: Option<String>,

    /// Write the module log to stdout.
    pub console: bool,

    /// Ship the module log to core over the broker.
    pub broker: bool,

    /// Action suffix of the topic log records are published on.
    pub action: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            escape: false,
            progname: None,
            console: true,
            broker: true,
            action: "logs".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
