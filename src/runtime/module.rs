//! The module facade.
//!
//! # Responsibilities
//! - Own the subsystems of one module and expose its operations
//! - Drive lifecycle transitions (start, stop, restart, shutdown)
//! - Hold the live config document and logger threshold
//!
//! # Design Decisions
//! - `Module` is a cheap handle (`Arc` inside); action handlers hold weak
//!   references so a dropped module does not stay alive through the broker
//! - Every transition runs its hook first, then its bookkeeping
//! - Transitions and the shutdown handshake hold one lock, so a start can
//!   never leave a heartbeat behind a shutdown; hooks must not call back
//!   into lifecycle operations
//! - After a shutdown, `start` is refused until the next `setup`
//! - Setup is serialized and idempotent

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};

use crate::broker::{BrokerClient, QoS};
use crate::config::{ModuleIdentity, RuntimeConfig};
use crate::error::ModuleError;
use crate::health::{AliveDataFn, AliveHandle, HeartbeatScheduler};
use crate::lifecycle::shutdown::Handshake;
use crate::lifecycle::startup::connect_with_retry;
use crate::lifecycle::{
    ExitHandler, HookKind, HookOutcome, HookTable, LifecycleCell, LifecycleState, Shutdown,
    ShutdownStatus,
};
use crate::observability::{FanoutLogger, Severity};
use crate::resilience::RetryPolicy;
use crate::routing::topic::validate_publish_topic;
use crate::routing::{ActionHandler, ActionRouter, Packet, Payload, Topic, TopicScheme, CORE};
use crate::runtime::actions;
use crate::runtime::builder::ModuleBuilder;

pub(crate) struct ModuleInner {
    pub(crate) identity: ModuleIdentity,
    pub(crate) config: RuntimeConfig,
    pub(crate) broker: Arc<dyn BrokerClient>,
    pub(crate) topics: TopicScheme,
    pub(crate) router: ActionRouter,
    pub(crate) logger: Arc<FanoutLogger>,
    pub(crate) state: Arc<LifecycleCell>,
    pub(crate) hooks: HookTable,
    pub(crate) heartbeat: HeartbeatScheduler,
    pub(crate) configs: ArcSwap<Value>,
    pub(crate) setup_lock: Mutex<()>,
    pub(crate) transition_lock: Mutex<()>,
    pub(crate) shut_down: AtomicBool,
    pub(crate) actions_registered: AtomicBool,
    pub(crate) subscribed: AtomicBool,
    pub(crate) exit_handler: ExitHandler,
    pub(crate) shutdown: Shutdown,
}

/// A module attached to core through a broker client.
#[derive(Clone)]
pub struct Module {
    pub(crate) inner: Arc<ModuleInner>,
}

impl Module {
    /// Start building a module with `config`.
    pub fn builder(config: RuntimeConfig) -> ModuleBuilder {
        ModuleBuilder::new(config)
    }

    pub(crate) fn from_inner(inner: ModuleInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.identity.name()
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.inner.identity
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn broker(&self) -> &Arc<dyn BrokerClient> {
        &self.inner.broker
    }

    pub fn logger(&self) -> &Arc<FanoutLogger> {
        &self.inner.logger
    }

    pub fn hooks(&self) -> &HookTable {
        &self.inner.hooks
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Observe every lifecycle state write.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Notified once a shutdown handshake has completed.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<ShutdownStatus> {
        self.inner.shutdown.subscribe()
    }

    /// The current config document (`null` until core sends one).
    pub fn configs(&self) -> Arc<Value> {
        self.inner.configs.load_full()
    }

    /// Render `topic`, defaulting the source to this module.
    pub fn topic_for(&self, topic: &Topic) -> String {
        self.inner.topics.render(topic)
    }

    /// Publish `payload` to `<self>/msg/<dest>/<action>` with retain off and
    /// exactly-once delivery.
    pub fn message_to(&self, dest: &str, action: &str, payload: &Value) -> Result<(), ModuleError> {
        self.message_to_with(dest, action, payload, false, QoS::ExactlyOnce)
    }

    /// Publish with explicit retain flag and QoS. Strings go out verbatim,
    /// anything else as JSON.
    pub fn message_to_with(
        &self,
        dest: &str,
        action: &str,
        payload: &Value,
        retain: bool,
        qos: QoS,
    ) -> Result<(), ModuleError> {
        let topic = self.inner.topics.outbound(dest, action);
        validate_publish_topic(&topic)?;
        let body = match payload {
            Value::String(text) => text.clone(),
            other => serde_json::to_string(other)?,
        };
        self.inner.broker.publish(&topic, body.as_bytes(), retain, qos)?;
        tracing::debug!(topic = %topic, retain, "Message published");
        Ok(())
    }

    /// Connect, register the default actions, subscribe to the module
    /// namespace and announce `ready`.
    ///
    /// With `retry`, connect follows the configured policy; otherwise a
    /// single attempt is made. Calling it again is a no-op while the
    /// connection holds.
    pub async fn setup(&self, retry: bool) -> Result<(), ModuleError> {
        let inner = &self.inner;
        let _guard = inner.setup_lock.lock().await;

        let policy = if retry {
            RetryPolicy::from(&inner.config.connect)
        } else {
            RetryPolicy::once()
        };
        let attempts = connect_with_retry(inner.broker.as_ref(), &policy, &inner.logger).await?;
        if attempts > 0 {
            // Fresh connection: the broker forgot our subscriptions.
            inner.subscribed.store(false, Ordering::Release);
        }

        if !inner.actions_registered.swap(true, Ordering::AcqRel) {
            actions::register_defaults(self);
        }

        if !inner.subscribed.load(Ordering::Acquire) {
            let filter = inner.topics.namespace_subscription();
            inner.broker.subscribe(&filter, QoS::ExactlyOnce)?;
            inner.subscribed.store(true, Ordering::Release);
            tracing::info!(module = %self.name(), filter = %filter, "Subscribed to module namespace");
            self.announce_ready();
        }

        inner.shut_down.store(false, Ordering::Release);
        Ok(())
    }

    fn announce_ready(&self) {
        if let Err(e) = self.message_to(CORE, "ready", &json!({})) {
            tracing::warn!(error = %e, "Ready announcement not delivered");
        }
    }

    /// Route core's `<action>` command for this module to `handler`.
    pub fn on_action(&self, action: &str, handler: ActionHandler) -> String {
        self.inner.router.on_action(action, handler)
    }

    pub fn remove_action(&self, action: &str) -> bool {
        self.inner.router.remove_action(action)
    }

    /// Names of the registered actions.
    pub fn actions(&self) -> Vec<String> {
        self.inner.router.actions()
    }

    /// Run the start hook, mark the module running and (re)start the
    /// heartbeat with the packet's `aliveTimeout`.
    pub async fn start(&self, packet: Option<Packet>) {
        let _transition = self.inner.transition_lock.lock().await;
        self.start_locked(packet).await;
    }

    /// Run the stop hook and mark the module stopped. The heartbeat keeps
    /// reporting the stopped status.
    pub async fn stop(&self) {
        let _transition = self.inner.transition_lock.lock().await;
        self.stop_locked().await;
    }

    pub async fn restart(&self, packet: Option<Packet>) {
        let _transition = self.inner.transition_lock.lock().await;
        self.stop_locked().await;
        self.start_locked(packet).await;
    }

    async fn start_locked(&self, packet: Option<Packet>) {
        if self.inner.shut_down.load(Ordering::Acquire) {
            self.inner.logger.warn("start ignored: module is shut down");
            return;
        }

        let outcome = self.inner.hooks.invoke(HookKind::Start, packet.clone()).await;
        self.report_hook(HookKind::Start, &outcome);

        let requested = packet.as_ref().and_then(|p| p.get("aliveTimeout"));
        let interval_ms = match requested.map(alive_timeout_ms) {
            Some(Some(ms)) => ms,
            Some(None) => {
                self.inner.logger.warn(format!(
                    "ignoring aliveTimeout {}, using {} ms",
                    requested.map(Value::to_string).unwrap_or_default(),
                    self.inner.config.heartbeat.default_interval_ms
                ));
                self.inner.config.heartbeat.default_interval_ms
            }
            None => self.inner.config.heartbeat.default_interval_ms,
        };

        self.inner.state.set(LifecycleState::Running);
        let handle = self.inner.heartbeat.start_sending_alive(interval_ms).await;
        self.inner
            .logger
            .info(format!("started, heartbeat every {:?}", handle.period()));
    }

    async fn stop_locked(&self) {
        let outcome = self.inner.hooks.invoke(HookKind::Stop, None).await;
        self.report_hook(HookKind::Stop, &outcome);

        self.inner.state.set(LifecycleState::Stopped);
        self.inner.logger.info("stopped");
    }

    /// Apply a `logger` command: `level` updates the threshold of every
    /// sink, an absent level leaves it unchanged.
    pub async fn update_logger(&self, packet: Packet) {
        let level = packet.get("level").cloned();
        let outcome = self.inner.hooks.invoke(HookKind::Logger, Some(packet)).await;
        self.report_hook(HookKind::Logger, &outcome);

        if let Some(level) = level {
            let severity = Severity::normalize(&level);
            self.inner.logger.set_severity_threshold(severity);
            tracing::info!(level = %severity, "Log threshold updated");
        }
    }

    /// Apply a `configs` command: the payload (JSON, YAML or raw text)
    /// replaces the config document.
    pub async fn update_configs(&self, packet: Packet) {
        let document = Payload::decode_document(packet.raw()).into_value();
        let packet = Packet::from_value(packet.topic, document.clone());
        let outcome = self.inner.hooks.invoke(HookKind::Configs, Some(packet)).await;
        self.report_hook(HookKind::Configs, &outcome);

        self.inner.configs.store(Arc::new(document));
        tracing::debug!("Config document replaced");
    }

    /// Graceful shutdown handshake. Exits the process through the exit
    /// handler when `exit_after` is set; otherwise returns the status.
    pub async fn on_shutdown(&self, exit_after: bool) -> ShutdownStatus {
        let inner = &self.inner;
        let transition = inner.transition_lock.lock().await;
        inner.shut_down.store(true, Ordering::Release);
        let status = Handshake {
            heartbeat: &inner.heartbeat,
            hooks: &inner.hooks,
            broker: inner.broker.as_ref(),
            logger: &inner.logger,
            status_topic: inner.topics.outbound(CORE, "shutdown"),
            grace: Duration::from_millis(inner.config.shutdown.publish_grace_ms),
        }
        .run()
        .await;

        inner.state.set(LifecycleState::Stopped);
        inner.subscribed.store(false, Ordering::Release);
        drop(transition);
        inner.shutdown.trigger(status);

        if exit_after {
            inner.logger.close();
            (inner.exit_handler)(status.exit_code());
        }
        status
    }

    pub async fn shutdown(&self, exit_after: bool) -> ShutdownStatus {
        self.on_shutdown(exit_after).await
    }

    /// Replace the heartbeat with one firing every `interval_ms`.
    pub async fn start_sending_alive(&self, interval_ms: u64) -> AliveHandle {
        self.inner.heartbeat.start_sending_alive(interval_ms).await
    }

    pub async fn stop_sending_alive(&self) -> bool {
        self.inner.heartbeat.stop_sending_alive().await
    }

    /// Attach extra data to every heartbeat.
    pub fn set_alive_data(&self, provider: Option<AliveDataFn>) {
        self.inner.heartbeat.set_data_provider(provider);
    }

    pub fn is_sending_alive(&self) -> bool {
        self.inner.heartbeat.is_active()
    }

    /// Number of heartbeat tasks running; never more than one.
    pub fn alive_tasks(&self) -> usize {
        self.inner.heartbeat.active_tasks()
    }

    fn report_hook(&self, kind: HookKind, outcome: &HookOutcome) {
        if let HookOutcome::Failed(reason) = outcome {
            self.inner
                .logger
                .error(format!("{} hook failed: {}", kind.as_str(), reason));
        }
    }
}

/// Heartbeat period carried in `aliveTimeout`: a positive number of
/// milliseconds given as an integer, a float or a numeric string.
fn alive_timeout_ms(value: &Value) -> Option<u64> {
    let ms = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (ms.is_finite() && ms >= 1.0).then(|| ms.round() as u64)
}
