// ABOUTME: Observer - polls every agent on a fixed cadence and renders a frame.
// ABOUTME: Reads only, never blocks agents, and stops once every agent is dead.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::sink::StatusSink;
use crate::agent::{AgentHandle, Phase};

/// One agent's state as seen at a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRow {
    pub agent: usize,
    pub alive: bool,
    pub phase: Phase,
    pub feasting: bool,
    pub level: f64,
    pub feasts: u64,
}

/// Everything the observer saw during one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based refresh number.
    pub refresh: u64,
    pub rows: Vec<AgentRow>,
}

impl Frame {
    /// Number of agents whose loop has exited.
    pub fn dead_count(&self) -> usize {
        self.rows.iter().filter(|row| !row.alive).count()
    }

    /// Number of agents feasting at this refresh.
    pub fn feasting_count(&self) -> usize {
        self.rows.iter().filter(|row| row.feasting).count()
    }

    /// Returns true once no agent is left alive.
    pub fn all_dead(&self) -> bool {
        self.dead_count() == self.rows.len()
    }
}

/// What the observer saw over its whole run.
#[derive(Debug, Clone)]
pub struct ObserverReport {
    /// Number of frames rendered.
    pub refreshes: u64,
    /// The frame in which every agent was dead.
    pub last_frame: Frame,
}

/// Passive reader of agent state.
///
/// Holds read-only handles; it cannot claim resources or change an agent.
/// Values may be read mid-update, so a frame is eventually consistent rather
/// than an atomic snapshot of the whole ring.
pub struct Observer {
    agents: Vec<AgentHandle>,
    interval: Duration,
    sink: Arc<dyn StatusSink>,
}

impl Observer {
    /// Create an observer over `agents`, refreshing every `interval`.
    pub fn new(agents: Vec<AgentHandle>, interval: Duration, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            agents,
            interval,
            sink,
        }
    }

    /// Read every agent once.
    pub fn snapshot(&self, refresh: u64) -> Frame {
        let rows = self
            .agents
            .iter()
            .map(|agent| {
                let phase = agent.phase();
                // Level before feasts: a refill is always counted by the time it shows.
                let level = agent.level();
                AgentRow {
                    agent: agent.id(),
                    alive: phase != Phase::Dead,
                    phase,
                    feasting: phase == Phase::Feasting && level > 0.0,
                    level,
                    feasts: agent.status().feasts(),
                }
            })
            .collect();
        Frame { refresh, rows }
    }

    /// Run the observer on its own task.
    pub fn spawn(self) -> JoinHandle<ObserverReport> {
        tokio::spawn(self.run())
    }

    /// Render frames until every agent is dead.
    pub async fn run(self) -> ObserverReport {
        for agent in &self.agents {
            agent.status().wait_started().await;
        }
        debug!(agents = self.agents.len(), "observer started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refresh = 0;

        loop {
            ticker.tick().await;
            let frame = self.snapshot(refresh);
            refresh += 1;

            if let Err(e) = self.sink.render(&frame).await {
                warn!(refresh = frame.refresh, error = %e, "status sink failed");
            }

            if frame.all_dead() {
                debug!(refreshes = refresh, "observer saw every agent die");
                return ObserverReport {
                    refreshes: refresh,
                    last_frame: frame,
                };
            }
        }
    }
}
