//! Process-wide diagnostics.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber used for runtime diagnostics
//! - Derive the default filter from the configured module log level
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - The module's own log stream (console + broker) goes through
//!   `FanoutLogger`, not through `tracing`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::observability::severity::Severity;

/// Default filter directive for a module log level.
pub fn default_directive(level: Severity) -> String {
    let level = tracing::Level::from(level);
    format!("module_runtime={}", level.as_str().to_ascii_lowercase())
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(level: Severity) {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(Severity::Debug), "module_runtime=debug");
        assert_eq!(default_directive(Severity::Fatal), "module_runtime=error");
    }
}
