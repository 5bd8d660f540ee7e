// ABOUTME: Agent - the think, acquire, feast/backoff loop over two adjacent resources.
// ABOUTME: Runs until its vitality tracker reports depletion, then stops the tracker.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::status::{AgentStatus, Phase};
use crate::config::{SimulationConfig, UnitRange};
use crate::error::ResourceError;
use crate::hook::{AgentEvent, HookRegistry};
use crate::resource::{HolderId, Resource};
use crate::vitality::VitalityTracker;

/// Summary of an agent's life, returned when its loop exits.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReport {
    /// Ring index of the agent.
    pub agent: usize,
    /// Completed feasts.
    pub feasts: u64,
    /// Acquisition attempts abandoned because the second resource was busy.
    pub backoffs: u64,
    /// How long the loop ran.
    pub lifetime: Duration,
    /// Vitality level at death.
    pub final_level: f64,
}

/// Read-only view of an agent, safe to share with observers.
///
/// Holds the same status and tracker the agent writes to, but exposes no way
/// to change them.
#[derive(Clone)]
pub struct AgentHandle {
    id: usize,
    left: usize,
    right: usize,
    status: Arc<AgentStatus>,
    vitality: Arc<VitalityTracker>,
}

impl AgentHandle {
    pub(crate) fn new(
        id: usize,
        (left, right): (usize, usize),
        status: Arc<AgentStatus>,
        vitality: Arc<VitalityTracker>,
    ) -> Self {
        Self {
            id,
            left,
            right,
            status,
            vitality,
        }
    }

    /// Ring index of the agent.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Ring indices of the agent's (left, right) resources.
    pub fn resources(&self) -> (usize, usize) {
        (self.left, self.right)
    }

    /// The agent's lifecycle status.
    pub fn status(&self) -> &AgentStatus {
        &self.status
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    /// Returns true while the agent's loop is running.
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// Returns true while the agent holds both resources with vitality left.
    pub fn is_feasting(&self) -> bool {
        self.status.phase() == Phase::Feasting && !self.vitality.depleted()
    }

    /// Current vitality level.
    pub fn level(&self) -> f64 {
        self.vitality.level()
    }

    /// Returns true if the agent's tracker is still running.
    pub fn vitality_active(&self) -> bool {
        self.vitality.is_active()
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("level", &self.level())
            .finish()
    }
}

/// An agent seated between two resources of the ring.
pub struct Agent {
    id: usize,
    left: Arc<Resource>,
    right: Arc<Resource>,
    vitality: Arc<VitalityTracker>,
    status: Arc<AgentStatus>,
    hooks: Arc<HookRegistry>,
    rng: StdRng,
    unit: Duration,
    think: UnitRange,
    feast: UnitRange,
    max_refill: f64,
}

impl Agent {
    /// Seat agent `id` between `left` and `right`.
    ///
    /// The agent's own randomness comes from `rng`; its tracker gets a
    /// generator seeded from it, so one seed reproduces both.
    ///
    /// # Panics
    ///
    /// Panics if `left` and `right` are the same resource.
    pub fn new(
        id: usize,
        left: Arc<Resource>,
        right: Arc<Resource>,
        config: &SimulationConfig,
        mut rng: StdRng,
    ) -> Self {
        assert!(
            !Arc::ptr_eq(&left, &right),
            "an agent needs two distinct resources"
        );

        let vitality = Arc::new(VitalityTracker::new(
            id,
            config.initial_level,
            config.decay,
            config.unit(),
            StdRng::from_rng(&mut rng),
        ));

        Self {
            id,
            left,
            right,
            vitality,
            status: Arc::new(AgentStatus::new()),
            hooks: Arc::new(HookRegistry::new()),
            rng,
            unit: config.unit(),
            think: config.think_units,
            feast: config.feast_units,
            max_refill: config.max_refill,
        }
    }

    /// Fire lifecycle events into `hooks`.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Ring index of the agent.
    pub fn id(&self) -> usize {
        self.id
    }

    /// A read-only view for observers.
    pub fn handle(&self) -> AgentHandle {
        AgentHandle::new(
            self.id,
            (self.left.id(), self.right.id()),
            Arc::clone(&self.status),
            Arc::clone(&self.vitality),
        )
    }

    /// Run the agent on its own task.
    pub fn spawn(self) -> JoinHandle<Result<AgentReport, ResourceError>> {
        tokio::spawn(self.run())
    }

    /// Run the agent until its vitality is depleted.
    ///
    /// Returns an error only if a release is rejected, which means the
    /// resource bookkeeping is broken. The tracker is stopped, held resources
    /// are freed and the agent marked dead either way, including when the
    /// task unwinds from a panic or is aborted.
    pub async fn run(mut self) -> Result<AgentReport, ResourceError> {
        let departure = Departure {
            holder: self.holder(),
            left: Arc::clone(&self.left),
            right: Arc::clone(&self.right),
            vitality: Arc::clone(&self.vitality),
            status: Arc::clone(&self.status),
        };

        // The decay task exits on its own once deactivated.
        let _decay = self.vitality.start();
        self.status.set_phase(Phase::Thinking);
        info!(agent = self.id, left = self.left.id(), right = self.right.id(), "agent seated");
        self.emit(AgentEvent::Seated { agent: self.id }).await;

        let outcome = self.dine().await;
        drop(departure);

        let feasts = self.status.feasts();
        info!(
            agent = self.id,
            feasts,
            backoffs = self.status.backoffs(),
            "agent died"
        );
        self.emit(AgentEvent::Died {
            agent: self.id,
            feasts,
        })
        .await;

        outcome?;
        Ok(AgentReport {
            agent: self.id,
            feasts,
            backoffs: self.status.backoffs(),
            lifetime: self.status.lifetime(),
            final_level: self.vitality.level(),
        })
    }

    async fn dine(&mut self) -> Result<(), ResourceError> {
        // Depletion is checked between cycles, never during a feast.
        while !self.vitality.depleted() {
            self.think().await;
            if self.vitality.depleted() {
                break;
            }

            if !self.acquire_both().await? {
                continue;
            }

            if self.vitality.depleted() {
                self.release_both().await?;
                break;
            }

            self.feast().await;
            self.release_both().await?;
        }
        Ok(())
    }

    async fn think(&mut self) {
        self.status.set_phase(Phase::Thinking);
        let units = self.think.sample(&mut self.rng);
        tokio::time::sleep(self.unit.saturating_mul(units)).await;
    }

    /// Blocking claim on the left, non-blocking on the right.
    ///
    /// Never waits on one resource while holding the other, so the ring cannot
    /// deadlock; it can livelock. Returns true when both are held.
    async fn acquire_both(&mut self) -> Result<bool, ResourceError> {
        self.status.set_phase(Phase::Acquiring);
        let me = self.holder();

        if !self.left.acquire(me, true).await {
            self.status.set_phase(Phase::Thinking);
            return Ok(false);
        }
        self.emit(AgentEvent::Acquired {
            agent: self.id,
            resource: self.left.id(),
        })
        .await;

        if !self.right.acquire(me, false).await {
            debug!(agent = self.id, resource = self.right.id(), "resource busy, backing off");
            self.status.record_backoff();
            self.emit(AgentEvent::BackedOff {
                agent: self.id,
                resource: self.right.id(),
            })
            .await;
            self.release(&self.left).await?;
            self.status.set_phase(Phase::Thinking);
            return Ok(false);
        }
        self.emit(AgentEvent::Acquired {
            agent: self.id,
            resource: self.right.id(),
        })
        .await;

        Ok(true)
    }

    async fn feast(&mut self) {
        let units = self.feast.sample(&mut self.rng);
        self.status.set_phase(Phase::Feasting);
        let level = self.vitality.level();
        debug!(agent = self.id, units, level, "feasting");
        self.emit(AgentEvent::FeastStarted {
            agent: self.id,
            level,
        })
        .await;

        tokio::time::sleep(self.unit.saturating_mul(units)).await;

        // Stop reporting as feasting before touching the level or the resources.
        self.status.set_phase(Phase::Thinking);
        self.status.record_feast();
        let refill = self.max_refill * f64::from(units) / f64::from(self.feast.max);
        let gained = self.vitality.fill(refill);
        let level = self.vitality.level();
        debug!(agent = self.id, gained, level, "feast finished");
        self.emit(AgentEvent::FeastFinished {
            agent: self.id,
            units,
            gained,
            level,
        })
        .await;
    }

    async fn release_both(&mut self) -> Result<(), ResourceError> {
        self.status.set_phase(Phase::Thinking);
        // Always attempt both; report the first failure.
        let left = self.release(&self.left).await;
        let right = self.release(&self.right).await;
        left.and(right)
    }

    async fn release(&self, resource: &Resource) -> Result<(), ResourceError> {
        self.emit(AgentEvent::Releasing {
            agent: self.id,
            resource: resource.id(),
        })
        .await;
        resource.release(self.holder())
    }

    async fn emit(&self, event: AgentEvent) {
        if let Err(e) = self.hooks.fire(&event).await {
            warn!(agent = self.id, error = %e, "hook failed");
        }
    }

    fn holder(&self) -> HolderId {
        HolderId(self.id)
    }
}

/// Puts an agent to rest when its loop ends, however it ends.
///
/// Dropped on normal exit, on a panic unwinding through the agent task, and
/// when the task is aborted, so neighbors never wait on a dead agent.
struct Departure {
    holder: HolderId,
    left: Arc<Resource>,
    right: Arc<Resource>,
    vitality: Arc<VitalityTracker>,
    status: Arc<AgentStatus>,
}

impl Drop for Departure {
    fn drop(&mut self) {
        for resource in [&self.left, &self.right] {
            if resource.holder() != Some(self.holder) {
                continue;
            }
            if let Err(e) = resource.release(self.holder) {
                warn!(agent = self.holder.0, error = %e, "release on exit failed");
            } else {
                debug!(agent = self.holder.0, resource = resource.id(), "released on exit");
            }
        }
        self.vitality.deactivate();
        self.status.set_dead();
    }
}
