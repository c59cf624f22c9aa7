//! Sink shipping log records to core over the broker.

use std::sync::Arc;

use crate::broker::{BrokerClient, QoS};
use crate::observability::metrics;
use crate::observability::severity::Severity;
use crate::observability::sink::{LogRecord, LogSink, SinkError, SinkOptions};

/// Publishes each record as JSON `{severity, timestamp, message, pid}`.
///
/// Records written while the client is disconnected are dropped. Nothing is
/// buffered or retried.
pub struct BrokerSink {
    broker: Arc<dyn BrokerClient>,
    topic: String,
    options: SinkOptions,
}

impl BrokerSink {
    pub fn new(broker: Arc<dyn BrokerClient>, topic: impl Into<String>) -> Self {
        Self {
            broker,
            topic: topic.into(),
            options: SinkOptions::new(Severity::default()),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl LogSink for BrokerSink {
    fn name(&self) -> &str {
        "broker"
    }

    fn options(&self) -> &SinkOptions {
        &self.options
    }

    fn emit(&self, record: &LogRecord) -> Result<(), SinkError> {
        if !self.broker.is_connected() {
            metrics::record_log_dropped(self.name());
            return Ok(());
        }
        let payload = serde_json::to_vec(record)?;
        self.broker
            .publish(&self.topic, &payload, false, QoS::AtMostOnce)
            .map_err(|e| {
                metrics::record_log_dropped(self.name());
                SinkError::Publish(e.to_string())
            })
    }
}
