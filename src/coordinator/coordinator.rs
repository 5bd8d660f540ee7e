// ABOUTME: Coordinator - builds the ring of resources and agents and runs them.
// ABOUTME: Seeds every random source, spawns all tasks, and joins them at the end.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{error, info};

use crate::agent::{Agent, AgentReport};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, DiningError};
use crate::hook::HookRegistry;
use crate::observer::{Frame, Observer, StatusSink};
use crate::resource::Resource;

/// Outcome of a full simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Root seed; passing it back in config replays the run's random draws.
    pub seed: u64,
    /// Number of frames the observer rendered.
    pub refreshes: u64,
    /// The observer's final frame, in which every agent is dead.
    pub final_frame: Frame,
    /// One report per agent, in ring order.
    pub agents: Vec<AgentReport>,
}

impl SimulationReport {
    /// Total feasts across all agents.
    pub fn total_feasts(&self) -> u64 {
        self.agents.iter().map(|agent| agent.feasts).sum()
    }

    /// Agents that died without ever feasting.
    pub fn starved(&self) -> Vec<usize> {
        self.agents
            .iter()
            .filter(|agent| agent.feasts == 0)
            .map(|agent| agent.agent)
            .collect()
    }
}

/// Builds and runs the ring.
///
/// Agent `i` sits between resource `i` on its left and resource
/// `(i + 1) % n` on its right, so neighbors share exactly one resource.
/// The ring is fixed at construction and never resized.
pub struct Coordinator {
    config: SimulationConfig,
    resources: Vec<Arc<Resource>>,
    hooks: Arc<HookRegistry>,
}

impl Coordinator {
    /// Validate `config` and create one resource per seat.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let resources = (0..config.agent_count)
            .map(|id| Arc::new(Resource::new(id)))
            .collect();
        Ok(Self {
            config,
            resources,
            hooks: Arc::new(HookRegistry::new()),
        })
    }

    /// The configuration this ring was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The ring of resources.
    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }

    /// Hooks every agent fires its lifecycle events into.
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Seat one agent per resource, drawing each agent's rng from `seed`.
    pub fn seat(&self, seed: u64) -> Vec<Agent> {
        let count = self.resources.len();
        let mut root = StdRng::seed_from_u64(seed);

        (0..count)
            .map(|id| {
                let left = Arc::clone(&self.resources[id]);
                let right = Arc::clone(&self.resources[(id + 1) % count]);
                Agent::new(id, left, right, &self.config, StdRng::from_rng(&mut root))
                    .with_hooks(Arc::clone(&self.hooks))
            })
            .collect()
    }

    /// Run every agent and the observer until all agents are dead.
    ///
    /// If any agent task fails (a panic inside a hook, say), the remaining
    /// tasks are aborted and the failure is returned as `DiningError::Task`.
    pub async fn run(&self, sink: Arc<dyn StatusSink>) -> Result<SimulationReport, DiningError> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            seed,
            agents = self.resources.len(),
            "agents begin dining"
        );

        let agents = self.seat(seed);
        let handles = agents.iter().map(Agent::handle).collect();
        let tasks: Vec<_> = agents.into_iter().map(Agent::spawn).collect();
        let mut aborts: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();

        let mut observer = Observer::new(handles, self.config.refresh_interval(), sink).spawn();
        aborts.push(observer.abort_handle());

        let mut pending: FuturesUnordered<_> = tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| async move { (index, task.await) })
            .collect();
        let mut reports: Vec<Option<AgentReport>> = vec![None; pending.len()];

        let outcome = async {
            let observed = loop {
                tokio::select! {
                    observed = &mut observer => break observed?,
                    Some((index, joined)) = pending.next() => {
                        reports[index] = Some(joined??);
                    }
                }
            };
            while let Some((index, joined)) = pending.next().await {
                reports[index] = Some(joined??);
            }
            Ok::<_, DiningError>(observed)
        }
        .await;

        let observed = match outcome {
            Ok(observed) => observed,
            Err(e) => {
                error!(seed, error = %e, "agent task failed, aborting the run");
                for abort in &aborts {
                    abort.abort();
                }
                return Err(e);
            }
        };
        let reports: Vec<AgentReport> = reports.into_iter().flatten().collect();

        let report = SimulationReport {
            seed,
            refreshes: observed.refreshes,
            final_frame: observed.last_frame,
            agents: reports,
        };
        info!(
            seed,
            refreshes = report.refreshes,
            feasts = report.total_feasts(),
            starved = report.starved().len(),
            "every agent has died"
        );
        Ok(report)
    }
}
