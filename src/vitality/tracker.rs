// ABOUTME: Vitality tracker - a bounded level drained by a periodic random decay.
// ABOUTME: Filled by feasts, depleted at zero, frozen once deactivated.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::DecayProfile;

/// Lowest level a tracker can hold. Reaching it means depletion.
pub const MIN_LEVEL: f64 = 0.0;
/// Highest level a tracker can hold.
pub const MAX_LEVEL: f64 = 100.0;

/// Time-decaying vitality for one agent.
///
/// The level lives in an atomic as raw `f64` bits so readers never lock and
/// never see a torn value. Writers serialize on a small mutex so that the
/// `active` check and the level update happen together: once `deactivate()`
/// returns, the level can no longer change.
pub struct VitalityTracker {
    owner: usize,
    level: AtomicU64,
    active: AtomicBool,
    write: Mutex<()>,
    decay: DecayProfile,
    unit: Duration,
    rng: Mutex<Option<StdRng>>,
    ticks: AtomicU64,
}

impl VitalityTracker {
    /// Create an active tracker for agent `owner`.
    ///
    /// # Arguments
    ///
    /// * `initial` - Starting level, clamped to `[0, 100]`.
    /// * `decay` - Interval and amount ranges for the decay task.
    /// * `unit` - Length of one time unit.
    /// * `rng` - Randomness source consumed by the decay task.
    pub fn new(owner: usize, initial: f64, decay: DecayProfile, unit: Duration, rng: StdRng) -> Self {
        Self {
            owner,
            level: AtomicU64::new(clamp(initial).to_bits()),
            active: AtomicBool::new(true),
            write: Mutex::new(()),
            decay,
            unit,
            rng: Mutex::new(Some(rng)),
            ticks: AtomicU64::new(0),
        }
    }

    /// Identity of the owning agent.
    pub fn owner(&self) -> usize {
        self.owner
    }

    /// Current level.
    pub fn level(&self) -> f64 {
        f64::from_bits(self.level.load(Ordering::SeqCst))
    }

    /// Returns true once the level has reached the floor.
    pub fn depleted(&self) -> bool {
        self.level() <= MIN_LEVEL
    }

    /// Returns true until the owning agent deactivates the tracker.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of decay ticks applied so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Add `amount` to the level, clamped at the ceiling.
    ///
    /// Returns the gain actually applied. Depletion is terminal, so a depleted
    /// or deactivated tracker ignores fills and returns zero.
    pub fn fill(&self, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        let _guard = self.write.lock();
        if !self.is_active() || self.depleted() {
            return 0.0;
        }
        let before = self.level();
        let after = clamp(before + amount);
        self.level.store(after.to_bits(), Ordering::SeqCst);
        after - before
    }

    /// Subtract `amount` from the level, clamped at the floor.
    ///
    /// Returns the loss actually applied; zero once deactivated.
    pub fn deplete(&self, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        let _guard = self.write.lock();
        if !self.is_active() {
            return 0.0;
        }
        let before = self.level();
        let after = clamp(before - amount);
        self.level.store(after.to_bits(), Ordering::SeqCst);
        before - after
    }

    /// Stop the tracker. The decay task exits at its next wake.
    pub fn deactivate(&self) {
        let _guard = self.write.lock();
        self.active.store(false, Ordering::SeqCst);
    }

    /// Launch the decay task.
    ///
    /// The task sleeps a random number of time units, then drains a random
    /// amount, until it wakes to find the tracker deactivated. It never
    /// restarts: a second call returns a task that exits immediately.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        let rng = self.rng.lock().take();

        tokio::spawn(async move {
            let Some(mut rng) = rng else {
                warn!(agent = tracker.owner, "vitality decay already started");
                return;
            };
            tracker.decay_loop(&mut rng).await;
        })
    }

    async fn decay_loop(&self, rng: &mut StdRng) {
        while self.is_active() {
            let units = self.decay.interval_units.sample(rng);
            tokio::time::sleep(self.unit.saturating_mul(units)).await;

            // Cancellation is only observed on wake, never mid-sleep.
            if !self.is_active() {
                break;
            }

            let amount = f64::from(self.decay.amount.sample(rng));
            let lost = self.deplete(amount);
            self.ticks.fetch_add(1, Ordering::SeqCst);
            trace!(agent = self.owner, lost, level = self.level(), "vitality decayed");
        }
        debug!(agent = self.owner, "vitality decay stopped");
    }
}

impl std::fmt::Debug for VitalityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VitalityTracker")
            .field("owner", &self.owner)
            .field("level", &self.level())
            .field("active", &self.is_active())
            .finish()
    }
}

fn clamp(level: f64) -> f64 {
    if level.is_nan() {
        return MIN_LEVEL;
    }
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}
