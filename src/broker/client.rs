//! Broker client capability interface.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::routing::topic::TopicError;

/// Delivery guarantee requested for a publish or subscription.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    #[default]
    ExactlyOnce = 2,
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}

/// A message as delivered by the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
    pub qos: QoS,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
            qos: QoS::default(),
        }
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("topic", &self.topic)
            .field("payload", &self.payload_str())
            .field("retain", &self.retain)
            .field("qos", &self.qos)
            .finish()
    }
}

/// Callback invoked for every message matching a registered topic pattern.
pub type TopicCallback = Arc<dyn Fn(Message) -> BoxFuture<'static, ()> + Send + Sync>;

/// Errors reported by a broker client.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The operation needs an established connection.
    #[error("broker client is not connected")]
    NotConnected,

    /// The broker refused or could not be reached.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The topic is not usable for the requested operation.
    #[error(transparent)]
    Topic(#[from] TopicError),

    /// Any other client-side failure.
    #[error("broker error: {0}")]
    Other(String),
}

/// Narrow view of a publish/subscribe client used by the runtime.
///
/// Publishing and subscribing are expected to return promptly; blocking on
/// the network is the implementation's concern.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Establish the connection. Calling it while connected is a no-op.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Tear the connection down.
    async fn disconnect(&self) -> Result<(), BrokerError>;

    fn is_connected(&self) -> bool;

    fn publish(&self, topic: &str, payload: &[u8], retain: bool, qos: QoS) -> Result<(), BrokerError>;

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), BrokerError>;

    /// Register `callback` for messages matching `pattern`, replacing any
    /// callback already registered for the same pattern.
    fn add_topic_callback(&self, pattern: &str, callback: TopicCallback);

    /// Returns true if a callback was registered for `pattern`.
    fn remove_topic_callback(&self, pattern: &str) -> bool;

    /// Number of registered topic callbacks.
    fn registered_callbacks(&self) -> usize;
}
