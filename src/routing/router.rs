//! Action registration and dispatch.
//!
//! # Responsibilities
//! - Map action names to handlers
//! - Register one broker callback per action on `core/<type>/<self>/<action>`
//! - Decode inbound payloads before handing them to handlers
//!
//! # Design Decisions
//! - At most one live registration per action; re-registering replaces it
//! - Decode failures fall back to the raw payload, never an error
//! - The router tracks the broker pattern per action so removal is exact

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::broker::{BrokerClient, Message, QoS, TopicCallback};
use crate::observability::metrics;
use crate::routing::payload::Packet;
use crate::routing::topic::TopicScheme;

/// Handler invoked with the decoded packet of an action.
pub type ActionHandler = Arc<dyn Fn(Packet) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as an [`ActionHandler`].
pub fn action_handler<F, Fut>(f: F) -> ActionHandler
where
    F: Fn(Packet) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Arc::new(move |packet: Packet| f(packet).boxed())
}

/// Routes core commands to registered action handlers.
pub struct ActionRouter {
    broker: Arc<dyn BrokerClient>,
    topics: TopicScheme,
    /// action name → broker pattern
    registrations: DashMap<String, String>,
}

impl ActionRouter {
    pub fn new(broker: Arc<dyn BrokerClient>, topics: TopicScheme) -> Self {
        Self {
            broker,
            topics,
            registrations: DashMap::new(),
        }
    }

    /// Register `handler` for `action`, replacing any previous registration.
    ///
    /// Returns the broker pattern the handler listens on.
    pub fn on_action(&self, action: &str, handler: ActionHandler) -> String {
        let pattern = self.topics.inbound_action(action);
        let action_name = action.to_string();

        let callback: TopicCallback = Arc::new(move |message: Message| {
            let handler = handler.clone();
            let action_name = action_name.clone();
            async move {
                metrics::record_action(&action_name);
                let packet = Packet::new(message.topic, message.payload);
                handler(packet).await;
            }
            .boxed()
        });

        self.broker.add_topic_callback(&pattern, callback);
        if let Some(previous) = self.registrations.insert(action.to_string(), pattern.clone()) {
            if previous != pattern {
                self.broker.remove_topic_callback(&previous);
            }
        }

        // Before connect, the namespace subscription made at setup covers it.
        if self.broker.is_connected() {
            if let Err(e) = self.broker.subscribe(&pattern, QoS::ExactlyOnce) {
                tracing::warn!(action = %action, error = %e, "Action subscription failed");
            }
        }

        tracing::debug!(action = %action, pattern = %pattern, "Action registered");
        pattern
    }

    /// Unregister `action`. Returns true if it was registered.
    pub fn remove_action(&self, action: &str) -> bool {
        match self.registrations.remove(action) {
            Some((_, pattern)) => {
                self.broker.remove_topic_callback(&pattern);
                tracing::debug!(action = %action, pattern = %pattern, "Action removed");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, action: &str) -> bool {
        self.registrations.contains_key(action)
    }

    /// Names of all registered actions.
    pub fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registrations.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBus;
    use crate::routing::payload::Payload;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn router_on(bus: &LocalBus) -> (ActionRouter, Arc<dyn BrokerClient>) {
        let broker: Arc<dyn BrokerClient> = Arc::new(bus.client("gauge"));
        (ActionRouter::new(broker.clone(), TopicScheme::new("gauge")), broker)
    }

    #[tokio::test]
    async fn test_on_action_adds_callback() {
        let bus = LocalBus::new();
        let (router, broker) = router_on(&bus);
        let before = broker.registered_callbacks();

        let pattern = router.on_action("some_action", action_handler(|_packet| async {}));
        assert_eq!(pattern, "core/msg/gauge/some_action");
        assert_eq!(broker.registered_callbacks(), before + 1);
        assert!(router.is_registered("some_action"));
    }

    #[tokio::test]
    async fn test_reregister_keeps_single_callback() {
        let bus = LocalBus::new();
        let (router, broker) = router_on(&bus);
        router.on_action("start", action_handler(|_packet| async {}));
        router.on_action("start", action_handler(|_packet| async {}));
        assert_eq!(broker.registered_callbacks(), 1);
        assert_eq!(router.actions(), vec!["start".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_action() {
        let bus = LocalBus::new();
        let (router, broker) = router_on(&bus);
        router.on_action("some_action", action_handler(|_packet| async {}));
        assert!(router.remove_action("some_action"));
        assert_eq!(broker.registered_callbacks(), 0);
        assert!(!router.remove_action("some_action"));
    }

    #[tokio::test]
    async fn test_dispatch_decodes_payload() {
        let bus = LocalBus::new();
        let (router, broker) = router_on(&bus);
        broker.connect().await.unwrap();
        broker.subscribe("+/msg/gauge/+", QoS::ExactlyOnce).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.on_action("start", action_handler(move |packet: Packet| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(packet.payload);
            }
        }));

        let core = bus.client("core");
        core.connect().await.unwrap();
        core.publish("core/msg/gauge/start", br#"{"aliveTimeout":2000}"#, false, QoS::ExactlyOnce)
            .unwrap();
        core.publish("core/msg/gauge/start", b"{broken", false, QoS::ExactlyOnce)
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, Payload::Structured(json!({"aliveTimeout": 2000})));
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second, Payload::Raw("{broken".into()));
    }
}
