//! Shared utilities for integration testing.
//!
//! `CorePeer` plays core on an in-process bus: it listens to everything
//! modules send to core and can issue commands to a module.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::mpsc;

use module_runtime::broker::{BrokerClient, LocalBroker, LocalBus, Message, QoS};
use module_runtime::observability::{LogRecord, LogSink, SinkError, SinkOptions};
use module_runtime::{Module, RuntimeConfig};

/// Core's side of the bus.
pub struct CorePeer {
    client: LocalBroker,
    inbox: mpsc::UnboundedReceiver<Message>,
}

impl CorePeer {
    pub async fn connect(bus: &LocalBus) -> Self {
        let client = bus.client("core");
        client.connect().await.unwrap();

        let (tx, inbox) = mpsc::unbounded_channel();
        client.add_topic_callback(
            "+/msg/core/+",
            Arc::new(move |message: Message| {
                let _ = tx.send(message);
                async {}.boxed()
            }),
        );
        client.subscribe("+/msg/core/+", QoS::ExactlyOnce).unwrap();

        Self { client, inbox }
    }

    /// Publish `payload` on `core/msg/<module>/<action>`.
    pub fn command(&self, module: &str, action: &str, payload: &str) {
        let topic = format!("core/msg/{}/{}", module, action);
        self.client
            .publish(&topic, payload.as_bytes(), false, QoS::ExactlyOnce)
            .unwrap();
    }

    /// Next message on `<module>/msg/core/<action>`, skipping others.
    pub async fn expect(&mut self, module: &str, action: &str) -> Message {
        let topic = format!("{}/msg/core/{}", module, action);
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let message = self.inbox.recv().await.expect("core inbox closed");
                if message.topic == topic {
                    return message;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no message on {}", topic))
    }

    /// Like [`expect`](Self::expect), decoded as JSON.
    pub async fn expect_json(&mut self, module: &str, action: &str) -> Value {
        let message = self.expect(module, action).await;
        serde_json::from_slice(&message.payload).unwrap()
    }

    /// Everything received so far.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// Runtime config for tests: no console output, short grace period.
pub fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.logging.console = false;
    config.shutdown.publish_grace_ms = 10;
    config
}

/// A module named `name` on `bus` whose exit handler records the code
/// (-1 until called).
pub fn module_on(bus: &LocalBus, name: &str) -> (Module, Arc<AtomicI32>) {
    let exit_code = Arc::new(AtomicI32::new(-1));
    let recorded = exit_code.clone();
    let module = Module::builder(test_config())
        .descriptor(serde_json::json!({ "name": name }))
        .broker(Arc::new(bus.client(name)))
        .exit_handler(Arc::new(move |code| recorded.store(code, Ordering::SeqCst)))
        .build()
        .unwrap();
    (module, exit_code)
}

/// Sink keeping every record in memory.
pub struct MemorySink {
    name: String,
    options: SinkOptions,
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            options: SinkOptions::default(),
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.records.lock().unwrap().iter().map(|r| r.message.clone()).collect()
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &SinkOptions {
        &self.options
    }

    fn emit(&self, record: &LogRecord) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
