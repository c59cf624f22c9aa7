//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ratios in (0, 1))
//! - Check the log level and metrics address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RuntimeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::RuntimeConfig;
use crate::observability::Severity;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a runtime configuration.
pub fn validate_config(config: &RuntimeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.heartbeat.default_interval_ms == 0 {
        errors.push(ValidationError::new(
            "heartbeat.default_interval_ms",
            "must be greater than 0",
        ));
    }

    let ratio = config.heartbeat.tick_timeout_ratio;
    if !(ratio > 0.0 && ratio < 1.0) {
        errors.push(ValidationError::new(
            "heartbeat.tick_timeout_ratio",
            format!("must be between 0 and 1 (exclusive), got {}", ratio),
        ));
    }

    if config.connect.max_attempts == Some(0) {
        errors.push(ValidationError::new(
            "connect.max_attempts",
            "must be at least 1 when set",
        ));
    }

    if config.connect.base_delay_ms > config.connect.max_delay_ms {
        errors.push(ValidationError::new(
            "connect.base_delay_ms",
            "must not exceed connect.max_delay_ms",
        ));
    }

    if Severity::parse(&config.logging.level).is_none() {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unsupported level '{}'", config.logging.level),
        ));
    }

    if config.logging.action.is_empty() || config.logging.action.contains(['/', '+', '#']) {
        errors.push(ValidationError::new(
            "logging.action",
            "must be a single non-wildcard topic level",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
