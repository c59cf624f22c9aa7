//! Module lifecycle state.
//!
//! # States
//! - Stopped: initial state, heartbeat reports `stopped`
//! - Running: started by core, heartbeat reports `running`
//!
//! # State Transitions
//! ```text
//! Stopped → Running: start
//! Running → Stopped: stop
//! restart = stop, then start
//! ```
//!
//! # Design Decisions
//! - Stored in an atomic so heartbeat ticks read it without locking
//! - Every write is broadcast, including writes that keep the same state,
//!   so observers see `restart` as Stopped followed by Running

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Stopped = 0,
    Running = 1,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Running => "running",
        }
    }
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Running,
            _ => LifecycleState::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, observable lifecycle state.
pub struct LifecycleCell {
    state: AtomicU8,
    transitions: broadcast::Sender<LifecycleState>,
}

impl LifecycleCell {
    pub fn new() -> Self {
        let (transitions, _) = broadcast::channel(64);
        Self {
            state: AtomicU8::new(LifecycleState::Stopped as u8),
            transitions,
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    /// Store `next` and return the previous state.
    pub fn set(&self, next: LifecycleState) -> LifecycleState {
        let previous = LifecycleState::from(self.state.swap(next as u8, Ordering::AcqRel));
        let _ = self.transitions.send(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Lifecycle transition");
        }
        previous
    }

    /// Receive every state written from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleState> {
        self.transitions.subscribe()
    }
}

impl Default for LifecycleCell {
    fn default() -> Self {
        Self::new()
    }
}
