//! In-process broker.
//!
//! # Responsibilities
//! - Fan published messages out to every connected client with a matching
//!   subscription
//! - Keep retained messages and replay them on subscribe
//! - Deliver each client's messages in order on a single task
//!
//! # Design Decisions
//! - Clients share one `LocalBus`; there is no network hop
//! - Disconnect clears subscriptions (clean session)
//! - Delivery drains after disconnect instead of aborting, so a callback
//!   that disconnects its own client runs to completion

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::broker::client::{BrokerClient, BrokerError, Message, QoS, TopicCallback};
use crate::routing::matcher::TopicFilter;
use crate::routing::topic::validate_publish_topic;

/// Shared message hub that `LocalBroker` clients attach to.
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    clients: RwLock<Vec<Weak<ClientShared>>>,
    retained: DashMap<String, Message>,
    taps: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new client attached to this bus.
    pub fn client(&self, client_id: impl Into<String>) -> LocalBroker {
        let shared = Arc::new(ClientShared {
            client_id: client_id.into(),
            connected: AtomicBool::new(false),
            subscriptions: RwLock::new(Vec::new()),
            callbacks: DashMap::new(),
            queue: Mutex::new(None),
            refuse_connects: AtomicU32::new(0),
            connect_calls: AtomicU32::new(0),
        });
        if let Ok(mut clients) = self.inner.clients.write() {
            clients.retain(|c| c.strong_count() > 0);
            clients.push(Arc::downgrade(&shared));
        }
        LocalBroker {
            bus: self.clone(),
            shared,
        }
    }

    /// Receive a copy of every message published on the bus.
    pub fn tap(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut taps) = self.inner.taps.lock() {
            taps.push(tx);
        }
        rx
    }

    /// Currently retained message for `topic`, if any.
    pub fn retained(&self, topic: &str) -> Option<Message> {
        self.inner.retained.get(topic).map(|m| m.value().clone())
    }

    fn route(&self, message: Message) {
        if message.retain {
            if message.payload.is_empty() {
                self.inner.retained.remove(&message.topic);
            } else {
                self.inner.retained.insert(message.topic.clone(), message.clone());
            }
        }

        if let Ok(mut taps) = self.inner.taps.lock() {
            taps.retain(|tap| tap.send(message.clone()).is_ok());
        }

        let clients: Vec<Arc<ClientShared>> = match self.inner.clients.read() {
            Ok(clients) => clients.iter().filter_map(Weak::upgrade).collect(),
            Err(_) => return,
        };
        for client in clients {
            if client.is_subscribed_to(&message.topic) {
                client.enqueue(message.clone());
            }
        }
    }

    fn replay_retained(&self, client: &ClientShared, filter: &TopicFilter) {
        if !filter.has_wildcards() {
            if let Some(message) = self.retained(filter.as_str()) {
                client.enqueue(message);
            }
            return;
        }
        for entry in self.inner.retained.iter() {
            if filter.matches(entry.key()) {
                client.enqueue(entry.value().clone());
            }
        }
    }
}

struct ClientShared {
    client_id: String,
    connected: AtomicBool,
    subscriptions: RwLock<Vec<TopicFilter>>,
    callbacks: DashMap<String, (TopicFilter, TopicCallback)>,
    queue: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    refuse_connects: AtomicU32,
    connect_calls: AtomicU32,
}

impl ClientShared {
    fn is_subscribed_to(&self, topic: &str) -> bool {
        self.connected.load(Ordering::Acquire)
            && self
                .subscriptions
                .read()
                .map(|subs| subs.iter().any(|f| f.matches(topic)))
                .unwrap_or(false)
    }

    fn enqueue(&self, message: Message) {
        if let Ok(queue) = self.queue.lock() {
            if let Some(tx) = queue.as_ref() {
                let _ = tx.send(message);
            }
        }
    }

    async fn dispatch(&self, message: Message) {
        // Collect first so no map guard is held across a callback.
        let matching: Vec<TopicCallback> = self
            .callbacks
            .iter()
            .filter(|entry| entry.value().0.matches(&message.topic))
            .map(|entry| entry.value().1.clone())
            .collect();

        if matching.is_empty() {
            tracing::trace!(client = %self.client_id, topic = %message.topic, "No callback for message");
        }

        for callback in matching {
            callback(message.clone()).await;
        }
    }
}

/// A client of a [`LocalBus`].
#[derive(Clone)]
pub struct LocalBroker {
    bus: LocalBus,
    shared: Arc<ClientShared>,
}

impl LocalBroker {
    /// Standalone client on a private bus.
    pub fn new(client_id: impl Into<String>) -> Self {
        LocalBus::new().client(client_id)
    }

    pub fn bus(&self) -> &LocalBus {
        &self.bus
    }

    pub fn client_id(&self) -> &str {
        &self.shared.client_id
    }

    /// Make the next `count` connect attempts fail.
    pub fn refuse_connects(&self, count: u32) {
        self.shared.refuse_connects.store(count, Ordering::SeqCst);
    }

    /// Number of times `connect` has been called.
    pub fn connect_calls(&self) -> u32 {
        self.shared.connect_calls.load(Ordering::SeqCst)
    }

    /// Filters this client is currently subscribed to.
    pub fn subscriptions(&self) -> Vec<String> {
        self.shared
            .subscriptions
            .read()
            .map(|subs| subs.iter().map(|f| f.as_str().to_string()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BrokerClient for LocalBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        self.shared.connect_calls.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .shared
            .refuse_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(BrokerError::ConnectionRefused(format!(
                "client '{}' refused by local bus",
                self.shared.client_id
            )));
        }

        if self.shared.connected.load(Ordering::Acquire) {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        {
            let mut queue = self
                .shared
                .queue
                .lock()
                .map_err(|_| BrokerError::Other("delivery queue poisoned".into()))?;
            *queue = Some(tx);
        }

        let shared = self.shared.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                shared.dispatch(message).await;
            }
            tracing::trace!(client = %shared.client_id, "Delivery loop finished");
        });

        self.shared.connected.store(true, Ordering::Release);
        tracing::debug!(client = %self.shared.client_id, "Connected to local bus");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.shared.connected.store(false, Ordering::Release);
        if let Ok(mut subs) = self.shared.subscriptions.write() {
            subs.clear();
        }
        if let Ok(mut queue) = self.shared.queue.lock() {
            queue.take();
        }
        tracing::debug!(client = %self.shared.client_id, "Disconnected from local bus");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    fn publish(&self, topic: &str, payload: &[u8], retain: bool, qos: QoS) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        validate_publish_topic(topic)?;

        self.bus.route(Message {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
            qos,
        });
        Ok(())
    }

    fn subscribe(&self, filter: &str, _qos: QoS) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        let filter = TopicFilter::new(filter);
        {
            let mut subs = self
                .shared
                .subscriptions
                .write()
                .map_err(|_| BrokerError::Other("subscription table poisoned".into()))?;
            if subs.contains(&filter) {
                return Ok(());
            }
            subs.push(filter.clone());
        }
        self.bus.replay_retained(&self.shared, &filter);
        Ok(())
    }

    fn add_topic_callback(&self, pattern: &str, callback: TopicCallback) {
        self.shared
            .callbacks
            .insert(pattern.to_string(), (TopicFilter::new(pattern), callback));
    }

    fn remove_topic_callback(&self, pattern: &str) -> bool {
        self.shared.callbacks.remove(pattern).is_some()
    }

    fn registered_callbacks(&self) -> usize {
        self.shared.callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::time::Duration;

    fn forward_to(tx: mpsc::UnboundedSender<Message>) -> TopicCallback {
        Arc::new(move |message: Message| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message);
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber() {
        let bus = LocalBus::new();
        let core = bus.client("core");
        let gauge = bus.client("gauge");
        core.connect().await.unwrap();
        gauge.connect().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        core.subscribe("+/msg/core/+", QoS::ExactlyOnce).unwrap();
        core.add_topic_callback("+/msg/core/+", forward_to(tx));

        gauge.publish("gauge/msg/core/alive", b"{}", false, QoS::ExactlyOnce).unwrap();
        gauge.publish("gauge/msg/other/alive", b"{}", false, QoS::ExactlyOnce).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(received.topic, "gauge/msg/core/alive");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let broker = LocalBroker::new("gauge");
        assert!(matches!(
            broker.publish("gauge/msg/core/alive", b"", false, QoS::AtMostOnce),
            Err(BrokerError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_publish_rejects_wildcards() {
        let broker = LocalBroker::new("gauge");
        broker.connect().await.unwrap();
        assert!(matches!(
            broker.publish("+/msg/core/alive", b"", false, QoS::AtMostOnce),
            Err(BrokerError::Topic(_))
        ));
    }

    #[tokio::test]
    async fn test_retained_message_replayed_on_subscribe() {
        let bus = LocalBus::new();
        let publisher = bus.client("pub");
        publisher.connect().await.unwrap();
        publisher.publish("a/msg/b/state", b"on", true, QoS::AtLeastOnce).unwrap();
        assert!(bus.retained("a/msg/b/state").is_some());

        let late = bus.client("late");
        late.connect().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        late.add_topic_callback("a/#", forward_to(tx));
        late.subscribe("a/#", QoS::AtLeastOnce).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(received.payload, b"on");
    }

    #[tokio::test]
    async fn test_retained_message_replayed_on_exact_subscribe() {
        let bus = LocalBus::new();
        let publisher = bus.client("pub");
        publisher.connect().await.unwrap();
        publisher.publish("a/msg/b/state", b"on", true, QoS::AtLeastOnce).unwrap();
        publisher.publish("a/msg/b/other", b"off", true, QoS::AtLeastOnce).unwrap();

        let late = bus.client("late");
        late.connect().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        late.add_topic_callback("a/#", forward_to(tx));
        late.subscribe("a/msg/b/state", QoS::AtLeastOnce).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(received.topic, "a/msg/b/state");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refused_connects() {
        let broker = LocalBroker::new("gauge");
        broker.refuse_connects(2);
        assert!(broker.connect().await.is_err());
        assert!(broker.connect().await.is_err());
        assert!(broker.connect().await.is_ok());
        assert_eq!(broker.connect_calls(), 3);
        assert!(broker.is_connected());
    }

    #[tokio::test]
    async fn test_callback_registry() {
        let broker = LocalBroker::new("gauge");
        let (tx, _rx) = mpsc::unbounded_channel();
        broker.add_topic_callback("core/msg/gauge/start", forward_to(tx.clone()));
        broker.add_topic_callback("core/msg/gauge/start", forward_to(tx.clone()));
        broker.add_topic_callback("core/msg/gauge/stop", forward_to(tx));
        assert_eq!(broker.registered_callbacks(), 2);
        assert!(broker.remove_topic_callback("core/msg/gauge/stop"));
        assert!(!broker.remove_topic_callback("core/msg/gauge/stop"));
        assert_eq!(broker.registered_callbacks(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_clears_subscriptions() {
        let broker = LocalBroker::new("gauge");
        broker.connect().await.unwrap();
        broker.subscribe("+/msg/gauge/+", QoS::ExactlyOnce).unwrap();
        broker.subscribe("+/msg/gauge/+", QoS::ExactlyOnce).unwrap();
        assert_eq!(broker.subscriptions(), vec!["+/msg/gauge/+".to_string()]);

        broker.disconnect().await.unwrap();
        assert!(!broker.is_connected());
        assert!(broker.subscriptions().is_empty());
    }
}
