//! User hooks attached to lifecycle transitions.
//!
//! # Responsibilities
//! - Hold at most one handler per hook kind
//! - Invoke a handler inside a guarded region (errors and panics caught)
//!
//! # Design Decisions
//! - Registering and invoking are separate operations
//! - An absent hook is not a failure
//! - Internal bookkeeping never depends on the hook outcome, except the
//!   shutdown status which is downgraded on failure

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::routing::Packet;

/// Error a hook may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult = Result<(), HookError>;

/// A lifecycle hook. Receives the inbound packet when the transition was
/// triggered by one.
pub type Hook = Arc<dyn Fn(Option<Packet>) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Transitions that accept a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Start,
    Stop,
    Shutdown,
    Logger,
    Configs,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Start => "start",
            HookKind::Stop => "stop",
            HookKind::Shutdown => "shutdown",
            HookKind::Logger => "logger",
            HookKind::Configs => "configs",
        }
    }
}

/// Result of invoking a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No hook registered.
    Absent,
    Completed,
    Failed(String),
}

impl HookOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, HookOutcome::Failed(_))
    }
}

/// Table of registered hooks.
#[derive(Default)]
pub struct HookTable {
    hooks: DashMap<HookKind, Hook>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook`, returning the one it replaces.
    pub fn register(&self, kind: HookKind, hook: Hook) -> Option<Hook> {
        self.hooks.insert(kind, hook)
    }

    /// Register an async closure as a hook.
    pub fn register_fn<F, Fut>(&self, kind: HookKind, f: F) -> Option<Hook>
    where
        F: Fn(Option<Packet>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.register(kind, Arc::new(move |packet: Option<Packet>| f(packet).boxed()))
    }

    pub fn unregister(&self, kind: HookKind) -> Option<Hook> {
        self.hooks.remove(&kind).map(|(_, hook)| hook)
    }

    pub fn is_registered(&self, kind: HookKind) -> bool {
        self.hooks.contains_key(&kind)
    }

    /// Run the hook for `kind`, catching errors and panics.
    pub async fn invoke(&self, kind: HookKind, packet: Option<Packet>) -> HookOutcome {
        // Clone out of the map so no guard is held across the await.
        let hook = match self.hooks.get(&kind) {
            Some(entry) => entry.value().clone(),
            None => return HookOutcome::Absent,
        };

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| hook(packet))) {
            Ok(future) => future,
            Err(panic) => return HookOutcome::Failed(panic_message(panic.as_ref())),
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => HookOutcome::Completed,
            Ok(Err(e)) => HookOutcome::Failed(e.to_string()),
            Err(panic) => HookOutcome::Failed(panic_message(panic.as_ref())),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("hook panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("hook panicked: {}", s)
    } else {
        "hook panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_absent_hook() {
        let table = HookTable::new();
        assert_eq!(table.invoke(HookKind::Start, None).await, HookOutcome::Absent);
    }

    #[tokio::test]
    async fn test_hook_receives_packet() {
        let table = HookTable::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_hook = seen.clone();
        table.register_fn(HookKind::Start, move |packet| {
            let seen = seen_in_hook.clone();
            async move {
                if packet.and_then(|p| p.get("aliveTimeout").cloned()).is_some() {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            }
        });

        let packet = Packet::from_value("core/msg/gauge/start", serde_json::json!({"aliveTimeout": 10}));
        assert_eq!(table.invoke(HookKind::Start, Some(packet)).await, HookOutcome::Completed);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_and_panic_are_caught() {
        let table = HookTable::new();
        table.register_fn(HookKind::Shutdown, |_| async { Err::<(), HookError>("disk busy".into()) });
        assert_eq!(
            table.invoke(HookKind::Shutdown, None).await,
            HookOutcome::Failed("disk busy".into())
        );

        table.register_fn(HookKind::Stop, |_| async {
            let fail = true;
            if fail {
                panic!("boom");
            }
            Ok(())
        });
        let outcome = table.invoke(HookKind::Stop, None).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_register_replaces_and_unregister() {
        let table = HookTable::new();
        assert!(table.register_fn(HookKind::Logger, |_| async { Ok(()) }).is_none());
        assert!(table.register_fn(HookKind::Logger, |_| async { Ok(()) }).is_some());
        assert!(table.unregister(HookKind::Logger).is_some());
        assert!(!table.is_registered(HookKind::Logger));
    }
}
