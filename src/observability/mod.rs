//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Module log calls (logger.info(..))
//!     → fanout.rs (threshold check, list order)
//!     → console.rs (human line on stdout)
//!     → broker_sink.rs (JSON record → <self>/msg/core/logs)
//!
//! Runtime internals:
//!     → tracing macros → logging.rs subscriber (stderr/stdout)
//!     → metrics.rs counters → optional Prometheus exporter
//! ```
//!
//! # Design Decisions
//! - One threshold shared by every sink of a fan-out
//! - Sinks never buffer; a record that cannot be delivered is dropped
//! - Severity is a closed enum, dispatch is direct

pub mod broker_sink;
pub mod console;
pub mod fanout;
pub mod logging;
pub mod metrics;
pub mod severity;
pub mod sink;

pub use broker_sink::BrokerSink;
pub use console::ConsoleSink;
pub use fanout::FanoutLogger;
pub use severity::Severity;
pub use sink::{LogRecord, LogSink, SinkError, SinkOptions};
