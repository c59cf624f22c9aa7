//! Fan-out logger.
//!
//! # Responsibilities
//! - Forward every write to each sink in list order
//! - Keep one severity threshold and escape mode across all sinks
//!
//! # Design Decisions
//! - A failing sink is reported through `tracing` and skipped
//! - Threshold changes hold the sink list lock so a concurrently added sink
//!   cannot miss the update

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use crate::observability::severity::Severity;
use crate::observability::sink::LogSink;

/// Logger writing to several sinks at once.
pub struct FanoutLogger {
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
    threshold: AtomicU8,
    escape: AtomicBool,
}

impl FanoutLogger {
    pub fn new(threshold: Severity) -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
            threshold: AtomicU8::new(threshold as u8),
            escape: AtomicBool::new(false),
        }
    }

    /// Build a logger over `sinks`, aligning them on `threshold`.
    pub fn with_sinks(threshold: Severity, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        let logger = Self::new(threshold);
        logger.replace_sinks(sinks);
        logger
    }

    pub fn add_sink(&self, sink: Arc<dyn LogSink>) {
        if let Ok(mut sinks) = self.sinks.write() {
            sink.set_threshold(self.threshold());
            sink.set_escape(self.escape());
            sinks.push(sink);
        }
    }

    /// Remove every sink named `name`. Returns true if one was removed.
    pub fn remove_sink(&self, name: &str) -> bool {
        match self.sinks.write() {
            Ok(mut sinks) => {
                let before = sinks.len();
                sinks.retain(|s| s.name() != name);
                sinks.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn replace_sinks(&self, new_sinks: Vec<Arc<dyn LogSink>>) {
        if let Ok(mut sinks) = self.sinks.write() {
            let threshold = self.threshold();
            let escape = self.escape();
            for sink in &new_sinks {
                sink.set_threshold(threshold);
                sink.set_escape(escape);
            }
            *sinks = new_sinks;
        }
    }

    pub fn sinks(&self) -> Vec<Arc<dyn LogSink>> {
        self.sinks.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn threshold(&self) -> Severity {
        Severity::from_u8(self.threshold.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Set the threshold on the logger and every sink.
    pub fn set_severity_threshold(&self, severity: Severity) {
        if let Ok(sinks) = self.sinks.write() {
            self.threshold.store(severity as u8, Ordering::Release);
            for sink in sinks.iter() {
                sink.set_threshold(severity);
            }
        }
    }

    pub fn escape(&self) -> bool {
        self.escape.load(Ordering::Acquire)
    }

    /// Toggle escaping on the logger and every sink.
    pub fn set_escape(&self, on: bool) {
        if let Ok(sinks) = self.sinks.write() {
            self.escape.store(on, Ordering::Release);
            for sink in sinks.iter() {
                sink.set_escape(on);
            }
        }
    }

    /// Returns true if a record of `severity` would be written.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.threshold()
    }

    pub fn write(&self, severity: Severity, message: &str) {
        if !self.enabled(severity) {
            return;
        }
        for sink in self.sinks() {
            if let Err(e) = sink.write(severity, message) {
                tracing::warn!(sink = %sink.name(), error = %e, "Log sink write failed");
            }
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.write(Severity::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write(Severity::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.write(Severity::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write(Severity::Error, message.as_ref());
    }

    pub fn fatal(&self, message: impl AsRef<str>) {
        self.write(Severity::Fatal, message.as_ref());
    }

    pub fn close(&self) {
        for sink in self.sinks() {
            if let Err(e) = sink.close() {
                tracing::warn!(sink = %sink.name(), error = %e, "Log sink close failed");
            }
        }
    }
}
