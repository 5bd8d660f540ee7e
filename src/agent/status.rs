// ABOUTME: Implements AgentStatus, the lock-free lifecycle view of one agent.
// ABOUTME: Provides phase tracking, readiness and death signals, and feast counters.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Where an agent is in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// The agent's loop has not started yet.
    Pending = 0,
    /// Idle, holding nothing.
    Thinking = 1,
    /// Reaching for its resources.
    Acquiring = 2,
    /// Holding both resources.
    Feasting = 3,
    /// Vitality ran out and the loop exited.
    Dead = 4,
}

impl Phase {
    /// Convert from u8 value to Phase.
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Pending,
            1 => Phase::Thinking,
            2 => Phase::Acquiring,
            3 => Phase::Feasting,
            _ => Phase::Dead,
        }
    }

    /// Returns true while the agent's loop is running.
    pub fn is_alive(self) -> bool {
        matches!(self, Phase::Thinking | Phase::Acquiring | Phase::Feasting)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pending => write!(f, "pending"),
            Phase::Thinking => write!(f, "thinking"),
            Phase::Acquiring => write!(f, "acquiring"),
            Phase::Feasting => write!(f, "feasting"),
            Phase::Dead => write!(f, "dead"),
        }
    }
}

/// Shared lifecycle state of one agent.
///
/// The agent writes; everyone else only reads. Reads never block:
/// the phase and counters are atomics.
pub struct AgentStatus {
    phase: AtomicU8,
    feasts: AtomicU64,
    backoffs: AtomicU64,
    started: Notify,
    finished: Notify,
    start_time: Mutex<Option<Instant>>,
    end_time: Mutex<Option<Instant>>,
}

impl AgentStatus {
    /// Create a status in the Pending phase.
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Pending as u8),
            feasts: AtomicU64::new(0),
            backoffs: AtomicU64::new(0),
            started: Notify::new(),
            finished: Notify::new(),
            start_time: Mutex::new(None),
            end_time: Mutex::new(None),
        }
    }

    /// Get the current phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Returns true while the agent's loop is running.
    pub fn is_alive(&self) -> bool {
        self.phase().is_alive()
    }

    /// Returns true once the agent's loop has exited.
    pub fn is_dead(&self) -> bool {
        self.phase() == Phase::Dead
    }

    /// Completed feasts.
    pub fn feasts(&self) -> u64 {
        self.feasts.load(Ordering::SeqCst)
    }

    /// Acquisition attempts abandoned because the second resource was busy.
    pub fn backoffs(&self) -> u64 {
        self.backoffs.load(Ordering::SeqCst)
    }

    /// Wait until the agent's loop has started.
    pub async fn wait_started(&self) {
        let notified = self.started.notified();
        tokio::pin!(notified);
        // Register before checking so a concurrent start cannot be missed.
        notified.as_mut().enable();
        if self.phase() != Phase::Pending {
            return;
        }
        notified.await;
    }

    /// Wait until the agent has died.
    pub async fn wait_dead(&self) {
        let notified = self.finished.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_dead() {
            return;
        }
        notified.await;
    }

    /// Wait for death with a timeout.
    ///
    /// Returns true if the agent died within the timeout.
    pub async fn wait_dead_with_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_dead()).await.is_ok()
    }

    /// How long the agent has been alive (or lived, once dead).
    pub fn lifetime(&self) -> Duration {
        let Some(start) = *self.start_time.lock() else {
            return Duration::ZERO;
        };
        match *self.end_time.lock() {
            Some(end) => end.duration_since(start),
            None => start.elapsed(),
        }
    }

    // Internal methods for the owning agent

    /// Move to `phase`. Leaving Pending signals readiness.
    pub(crate) fn set_phase(&self, phase: Phase) {
        let previous = Phase::from_u8(self.phase.swap(phase as u8, Ordering::SeqCst));
        if previous == Phase::Pending && phase != Phase::Pending {
            let mut start = self.start_time.lock();
            if start.is_none() {
                *start = Some(Instant::now());
            }
            drop(start);
            self.started.notify_waiters();
        }
    }

    pub(crate) fn record_feast(&self) {
        self.feasts.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_backoff(&self) {
        self.backoffs.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark the agent dead and wake everyone waiting on it.
    pub(crate) fn set_dead(&self) {
        {
            let mut start = self.start_time.lock();
            let now = Instant::now();
            if start.is_none() {
                *start = Some(now);
            }
            *self.end_time.lock() = Some(now);
        }
        let previous = Phase::from_u8(self.phase.swap(Phase::Dead as u8, Ordering::SeqCst));
        if previous == Phase::Pending {
            self.started.notify_waiters();
        }
        self.finished.notify_waiters();
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::new()
    }
}
