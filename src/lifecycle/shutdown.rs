//! Shutdown handshake and coordination.
//!
//! # Sequence
//! ```text
//! 1. cancel heartbeat (best effort)
//! 2. run shutdown hook (guarded; failure → "nok")
//! 3. publish {status} to core/shutdown if connected (best effort)
//! 4. short pause so the publish can leave
//! 5. disconnect if connected
//! 6. (facade) mark stopped, notify, exit with 0/1 if requested
//! ```
//!
//! # Design Decisions
//! - No step aborts the sequence
//! - The pause is a soft delivery guarantee, not a flush
//! - Process exit goes through an injectable handler

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::broker::{BrokerClient, QoS};
use crate::health::HeartbeatScheduler;
use crate::lifecycle::hooks::{HookKind, HookOutcome, HookTable};
use crate::observability::FanoutLogger;

/// Outcome reported to core at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownStatus {
    Ok,
    Nok,
}

impl ShutdownStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownStatus::Ok => "ok",
            ShutdownStatus::Nok => "nok",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownStatus::Ok => 0,
            ShutdownStatus::Nok => 1,
        }
    }
}

/// Terminates the process with the given code.
pub type ExitHandler = Arc<dyn Fn(i32) + Send + Sync>;

/// Exit handler calling `std::process::exit`.
pub fn process_exit() -> ExitHandler {
    Arc::new(|code| std::process::exit(code))
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that long-running tasks can subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<ShutdownStatus>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownStatus> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self, status: ShutdownStatus) {
        let _ = self.tx.send(status);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the handshake touches.
pub struct Handshake<'a> {
    pub heartbeat: &'a HeartbeatScheduler,
    pub hooks: &'a HookTable,
    pub broker: &'a dyn BrokerClient,
    pub logger: &'a FanoutLogger,
    /// Topic the shutdown status is published on.
    pub status_topic: String,
    pub grace: Duration,
}

impl Handshake<'_> {
    /// Run steps 1 to 5 and return the status to report.
    pub async fn run(self) -> ShutdownStatus {
        if self.heartbeat.stop_sending_alive().await {
            tracing::debug!("Heartbeat cancelled for shutdown");
        }

        let status = match self.hooks.invoke(HookKind::Shutdown, None).await {
            HookOutcome::Failed(reason) => {
                self.logger.error(format!("shutdown hook failed: {}", reason));
                ShutdownStatus::Nok
            }
            HookOutcome::Completed | HookOutcome::Absent => ShutdownStatus::Ok,
        };

        if self.broker.is_connected() {
            let payload = json!({ "status": status }).to_string();
            if let Err(e) = self.broker.publish(
                &self.status_topic,
                payload.as_bytes(),
                false,
                QoS::ExactlyOnce,
            ) {
                tracing::warn!(topic = %self.status_topic, error = %e, "Shutdown status not delivered");
            }
        } else {
            tracing::debug!("Broker disconnected, skipping shutdown status");
        }

        tokio::time::sleep(self.grace).await;

        if self.broker.is_connected() {
            if let Err(e) = self.broker.disconnect().await {
                tracing::warn!(error = %e, "Broker disconnect failed during shutdown");
            }
        }

        tracing::info!(status = status.as_str(), "Shutdown handshake complete");
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBus;
    use crate::lifecycle::hooks::HookError;
    use crate::lifecycle::state::LifecycleCell;

    async fn handshake_with(hooks: HookTable) -> (ShutdownStatus, Vec<crate::broker::Message>, bool) {
        let bus = LocalBus::new();
        let mut tap = bus.tap();
        let broker: Arc<dyn BrokerClient> = Arc::new(bus.client("gauge"));
        broker.connect().await.unwrap();

        let heartbeat = HeartbeatScheduler::new(
            broker.clone(),
            "gauge/msg/core/alive",
            Arc::new(LifecycleCell::new()),
            0.8,
        );
        heartbeat.start_sending_alive(1000).await;
        let logger = FanoutLogger::new(crate::observability::Severity::Info);

        let status = Handshake {
            heartbeat: &heartbeat,
            hooks: &hooks,
            broker: broker.as_ref(),
            logger: &logger,
            status_topic: "gauge/msg/core/shutdown".into(),
            grace: Duration::from_millis(10),
        }
        .run()
        .await;

        assert!(!heartbeat.is_active());
        let mut published = Vec::new();
        while let Ok(message) = tap.try_recv() {
            published.push(message);
        }
        (status, published, broker.is_connected())
    }

    #[tokio::test]
    async fn test_clean_shutdown() {
        let (status, published, connected) = handshake_with(HookTable::new()).await;
        assert_eq!(status, ShutdownStatus::Ok);
        assert_eq!(status.exit_code(), 0);
        let last = published.last().unwrap();
        assert_eq!(last.topic, "gauge/msg/core/shutdown");
        assert_eq!(last.payload_str(), r#"{"status":"ok"}"#);
        assert!(!connected);
    }

    #[tokio::test]
    async fn test_failing_hook_downgrades_status() {
        let hooks = HookTable::new();
        hooks.register_fn(HookKind::Shutdown, |_| async { Err::<(), HookError>("flush failed".into()) });

        let (status, published, connected) = handshake_with(hooks).await;
        assert_eq!(status, ShutdownStatus::Nok);
        assert_eq!(status.exit_code(), 1);
        assert!(published
            .iter()
            .any(|m| m.topic == "gauge/msg/core/shutdown" && m.payload_str() == r#"{"status":"nok"}"#));
        assert!(!connected);
    }

    #[test]
    fn test_coordinator_broadcasts_status() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        shutdown.trigger(ShutdownStatus::Nok);
        assert_eq!(rx.try_recv().unwrap(), ShutdownStatus::Nok);
    }
}
