//! Heartbeat scheduling.
//!
//! # Responsibilities
//! - Periodically publish `{status, lastSeen[, data]}` to core
//! - Keep at most one heartbeat task alive
//!
//! # Design Decisions
//! - Starting a heartbeat cancels the previous one and waits for it to exit
//!   before spawning the next, so two tasks never overlap
//! - First tick fires immediately, then once per period
//! - Each tick runs under a timeout shorter than the period and is isolated:
//!   a failed, panicking or timed out tick is logged and the next one still runs
//! - Publish is synchronous, so a tick runs on the blocking pool; a hung
//!   publish is abandoned at the timeout instead of stalling the scheduler
//! - Cancellation is checked between ticks, so it waits at most one tick timeout

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::broker::{BrokerClient, BrokerError, QoS};
use crate::lifecycle::state::LifecycleCell;
use crate::observability::metrics;
use crate::observability::sink::format_timestamp;

/// Extra data merged under `data` in every heartbeat, evaluated per tick.
pub type AliveDataFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Observer side of a heartbeat task.
#[derive(Debug, Clone)]
pub struct AliveHandle {
    cancelled: Arc<AtomicBool>,
    period: Duration,
}

impl AliveHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

struct AliveTask {
    handle: AliveHandle,
    cancel: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl AliveTask {
    async fn cancel_and_wait(self) {
        self.handle.cancelled.store(true, Ordering::Release);
        let _ = self.cancel.send(true);
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "Heartbeat task ended abnormally");
        }
    }
}

/// Everything a tick needs, shared with the spawned task.
#[derive(Clone)]
struct Beat {
    broker: Arc<dyn BrokerClient>,
    topic: Arc<str>,
    state: Arc<LifecycleCell>,
    data: Arc<RwLock<Option<AliveDataFn>>>,
    timed_out: Arc<AtomicU64>,
}

impl Beat {
    fn payload(&self) -> Value {
        let mut payload = json!({
            "status": self.state.get(),
            "lastSeen": format_timestamp(&Utc::now()),
        });
        let provider = self.data.read().ok().and_then(|d| d.clone());
        if let Some(provider) = provider {
            payload["data"] = provider();
        }
        payload
    }

    fn send(&self) -> Result<(), BrokerError> {
        let payload = self.payload().to_string();
        self.broker
            .publish(&self.topic, payload.as_bytes(), false, QoS::ExactlyOnce)
    }

    async fn tick(&self, timeout: Duration) {
        let beat = self.clone();
        let work = tokio::task::spawn_blocking(move || beat.send());
        match time::timeout(timeout, work).await {
            Ok(Ok(Ok(()))) => metrics::record_heartbeat("sent"),
            Ok(Ok(Err(e))) => {
                metrics::record_heartbeat("failed");
                tracing::warn!(topic = %self.topic, error = %e, "Heartbeat publish failed");
            }
            Ok(Err(e)) => {
                metrics::record_heartbeat("failed");
                tracing::error!(topic = %self.topic, error = %e, "Heartbeat tick panicked");
            }
            Err(_) => {
                // The blocking publish is left to finish on its own.
                self.timed_out.fetch_add(1, Ordering::AcqRel);
                metrics::record_heartbeat("timeout");
                tracing::warn!(topic = %self.topic, timeout = ?timeout, "Heartbeat tick timed out");
            }
        }
    }
}

/// Owns the module's single heartbeat task.
pub struct HeartbeatScheduler {
    beat: Beat,
    tick_timeout_ratio: f64,
    current: Mutex<Option<AliveTask>>,
    running: Arc<AtomicUsize>,
}

impl HeartbeatScheduler {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        topic: impl Into<String>,
        state: Arc<LifecycleCell>,
        tick_timeout_ratio: f64,
    ) -> Self {
        let topic: String = topic.into();
        Self {
            beat: Beat {
                broker,
                topic: Arc::from(topic),
                state,
                data: Arc::new(RwLock::new(None)),
                timed_out: Arc::new(AtomicU64::new(0)),
            },
            tick_timeout_ratio,
            current: Mutex::new(None),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.beat.topic
    }

    /// Set or clear the provider of the `data` block.
    pub fn set_data_provider(&self, provider: Option<AliveDataFn>) {
        if let Ok(mut data) = self.beat.data.write() {
            *data = provider;
        }
    }

    /// Replace the running heartbeat with one firing every `interval_ms`.
    ///
    /// The previous task, if any, is cancelled and awaited first.
    pub async fn start_sending_alive(&self, interval_ms: u64) -> AliveHandle {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.cancel_and_wait().await;
        }

        let period = Duration::from_millis(interval_ms.max(1));
        let tick_timeout = period.mul_f64(self.tick_timeout_ratio);
        let handle = AliveHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
            period,
        };
        let (cancel, mut cancel_rx) = watch::channel(false);

        let beat = self.beat.clone();
        let cancelled = handle.cancelled.clone();
        let running = self.running.clone();
        running.fetch_add(1, Ordering::AcqRel);

        let join = tokio::spawn(async move {
            tracing::debug!(topic = %beat.topic, period = ?period, "Heartbeat started");
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    _ = ticker.tick() => {
                        if cancelled.load(Ordering::Acquire) {
                            break;
                        }
                        beat.tick(tick_timeout).await;
                    }
                }
            }

            running.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(topic = %beat.topic, "Heartbeat stopped");
        });

        *current = Some(AliveTask {
            handle: handle.clone(),
            cancel,
            join,
        });
        handle
    }

    /// Cancel the running heartbeat. Returns true if one was running.
    pub async fn stop_sending_alive(&self) -> bool {
        let previous = self.current.lock().await.take();
        match previous {
            Some(task) => {
                task.cancel_and_wait().await;
                true
            }
            None => false,
        }
    }

    /// Returns true while a heartbeat task is running.
    pub fn is_active(&self) -> bool {
        self.active_tasks() > 0
    }

    /// Number of heartbeat tasks currently running.
    pub fn active_tasks(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Ticks abandoned because publishing outlasted the tick timeout.
    pub fn timed_out_ticks(&self) -> u64 {
        self.beat.timed_out.load(Ordering::Acquire)
    }
}
