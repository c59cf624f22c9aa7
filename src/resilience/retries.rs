//! Retry policy for the setup connect loop.
//!
//! # Responsibilities
//! - Decide whether another attempt is allowed
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - `max_attempts: None` means retry forever
//! - Retrying can be switched off entirely (single attempt)

use std::time::Duration;

use crate::config::ConnectConfig;
use crate::resilience::backoff::calculate_backoff;

/// How many connect attempts to make and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A single attempt, no retry.
    pub fn once() -> Self {
        Self {
            max_attempts: Some(1),
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Retry forever with the given backoff bounds.
    pub fn unbounded(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: None,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Returns true if attempt number `attempt` (1-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Delay to wait after failed attempt number `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl From<&ConnectConfig> for RetryPolicy {
    fn from(config: &ConnectConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ConnectConfig::default())
    }
}
