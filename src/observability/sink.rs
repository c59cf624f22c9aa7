//! Log sink abstraction and the record shape sinks receive.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::observability::severity::Severity;

/// Timestamp format shared by log records and status packets.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Render a UTC instant with millisecond precision.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn serialize_timestamp<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(at))
}

/// One log line as handed to a sink.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub severity: Severity,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub pid: u32,
}

impl LogRecord {
    /// Record stamped with the current time and process id.
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            timestamp: Utc::now(),
            message: message.into(),
            pid: std::process::id(),
        }
    }
}

/// Errors a sink may report for a single write.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("sink lock poisoned")]
    Poisoned,
}

/// Quote and escape a message so control characters and quotes survive
/// line-oriented consumers. `"a\nb"` stays on one line and reads back as
/// the original text.
pub fn escape_message(message: &str) -> String {
    format!("\"{}\"", message.escape_debug())
}

/// Threshold and escape mode carried by every sink.
#[derive(Debug)]
pub struct SinkOptions {
    threshold: AtomicU8,
    escape: AtomicBool,
}

impl SinkOptions {
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold: AtomicU8::new(threshold as u8),
            escape: AtomicBool::new(false),
        }
    }

    pub fn threshold(&self) -> Severity {
        Severity::from_u8(self.threshold.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set_threshold(&self, severity: Severity) {
        self.threshold.store(severity as u8, Ordering::Release);
    }

    pub fn escape(&self) -> bool {
        self.escape.load(Ordering::Acquire)
    }

    pub fn set_escape(&self, on: bool) {
        self.escape.store(on, Ordering::Release);
    }

    pub fn enabled_for(&self, severity: Severity) -> bool {
        severity >= self.threshold()
    }
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self::new(Severity::default())
    }
}

/// A concrete log destination.
pub trait LogSink: Send + Sync {
    /// Name used to find the sink again in a fan-out.
    fn name(&self) -> &str;

    fn options(&self) -> &SinkOptions;

    /// Deliver an already filtered and rendered record.
    fn emit(&self, record: &LogRecord) -> Result<(), SinkError>;

    fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn threshold(&self) -> Severity {
        self.options().threshold()
    }

    fn set_threshold(&self, severity: Severity) {
        self.options().set_threshold(severity);
    }

    fn set_escape(&self, on: bool) {
        self.options().set_escape(on);
    }

    /// Filter by threshold, apply escaping and emit.
    fn write(&self, severity: Severity, message: &str) -> Result<(), SinkError> {
        let options = self.options();
        if !options.enabled_for(severity) {
            return Ok(());
        }
        let message = if options.escape() {
            escape_message(message)
        } else {
            message.to_string()
        };
        self.emit(&LogRecord::now(severity, message))
    }
}
