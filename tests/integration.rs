// ABOUTME: Integration tests running whole rings of agents end to end.
// ABOUTME: Checks exclusion, progress, bounds, monotonicity, starvation, and termination.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;

use dining::prelude::*;

/// Config whose agents reliably die: decay outpaces the best possible refill.
fn mortal_config(agents: usize, seed: u64) -> SimulationConfig {
    SimulationConfig::default()
        .agent_count(agents)
        .seed(seed)
        .time_unit(Duration::from_millis(100))
        .observer_interval(Duration::from_millis(50))
        .think_units(UnitRange::new(1, 3))
        .feast_units(UnitRange::new(1, 3))
        .max_refill(3.0)
        .decay(DecayProfile {
            interval_units: UnitRange::new(1, 2),
            amount: UnitRange::new(3, 6),
        })
}

/// Tracks how many agents hold each resource according to lifecycle events.
struct ExclusionHook {
    holders: Mutex<HashMap<usize, usize>>,
    violated: AtomicBool,
}

#[async_trait]
impl Hook for ExclusionHook {
    async fn on_event(&self, event: &AgentEvent) -> Result<(), anyhow::Error> {
        let mut holders = self.holders.lock();
        match event {
            AgentEvent::Acquired { resource, .. } => {
                let count = holders.entry(*resource).or_insert(0);
                *count += 1;
                if *count > 1 {
                    self.violated.store(true, Ordering::SeqCst);
                }
            }
            AgentEvent::Releasing { resource, .. } => {
                let count = holders.entry(*resource).or_insert(0);
                *count = count.saturating_sub(1);
            }
            _ => {}
        }
        Ok(())
    }

    fn accepts(&self, event: &AgentEvent) -> bool {
        matches!(
            event,
            AgentEvent::Acquired { .. } | AgentEvent::Releasing { .. }
        )
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_agents_both_feast_before_dying() {
    let coordinator = Coordinator::new(mortal_config(2, 7)).unwrap();
    let report = coordinator.run(MemorySink::shared()).await.unwrap();

    assert_eq!(report.agents.len(), 2);
    for agent in &report.agents {
        assert!(
            agent.feasts >= 1,
            "agent {} never feasted: {:?}",
            agent.agent,
            agent
        );
    }
    assert!(report.final_frame.all_dead());
}

#[tokio::test(start_paused = true)]
async fn test_default_ring_of_five_ends_with_all_dead() {
    let config = SimulationConfig::default()
        .seed(2024)
        .time_unit(Duration::from_millis(10));
    assert_eq!(config.agent_count, 5);

    let coordinator = Coordinator::new(config).unwrap();
    let sink = MemorySink::shared();
    let report = coordinator.run(sink.clone()).await.unwrap();

    let last = sink.last().await.expect("observer should render");
    assert_eq!(last.rows.len(), 5);
    assert_eq!(last.dead_count(), 5);
    assert_eq!(last, report.final_frame);
    assert_eq!(report.agents.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_levels_stay_in_bounds_at_every_refresh() {
    let coordinator = Coordinator::new(mortal_config(5, 11)).unwrap();
    let sink = MemorySink::shared();
    coordinator.run(sink.clone()).await.unwrap();

    let frames = sink.frames().await;
    assert!(!frames.is_empty());
    for frame in &frames {
        for row in &frame.rows {
            assert!(
                (MIN_LEVEL..=MAX_LEVEL).contains(&row.level),
                "agent {} level {} out of bounds at refresh {}",
                row.agent,
                row.level,
                frame.refresh
            );
            if row.feasting {
                assert!(row.level > 0.0);
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_resources_are_mutually_exclusive() {
    let coordinator = Coordinator::new(mortal_config(5, 23)).unwrap();
    let hook = Arc::new(ExclusionHook {
        holders: Mutex::new(HashMap::new()),
        violated: AtomicBool::new(false),
    });
    coordinator.hooks().register_arc(hook.clone()).await;

    let report = coordinator.run(MemorySink::shared()).await.unwrap();

    assert!(report.total_feasts() > 0);
    assert!(
        !hook.violated.load(Ordering::SeqCst),
        "a resource had two holders at once"
    );
    assert!(hook.holders.lock().values().all(|&count| count == 0));
}

#[tokio::test(start_paused = true)]
async fn test_neighbors_never_feast_together() {
    let coordinator = Coordinator::new(mortal_config(5, 5)).unwrap();
    let feasting = Arc::new(Mutex::new(vec![false; 5]));
    let violated = Arc::new(AtomicBool::new(false));
    {
        let feasting = feasting.clone();
        let violated = violated.clone();
        coordinator
            .hooks()
            .on_event(move |event| {
                let mut feasting = feasting.lock();
                match event {
                    AgentEvent::FeastStarted { agent, .. } => {
                        let left = (agent + 4) % 5;
                        let right = (agent + 1) % 5;
                        if feasting[left] || feasting[right] {
                            violated.store(true, Ordering::SeqCst);
                        }
                        feasting[*agent] = true;
                    }
                    AgentEvent::FeastFinished { agent, .. } => feasting[*agent] = false,
                    _ => {}
                }
            })
            .await;
    }

    coordinator.run(MemorySink::shared()).await.unwrap();
    assert!(!violated.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_ring_makes_forward_progress() {
    let config = mortal_config(5, 31);
    let unit = config.unit();
    let coordinator = Arc::new(Coordinator::new(config).unwrap());

    let died = Arc::new(AtomicUsize::new(0));
    {
        let died = died.clone();
        coordinator
            .hooks()
            .on_event(move |event| {
                if matches!(event, AgentEvent::Died { .. }) {
                    died.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
    }

    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run(MemorySink::shared()).await })
    };

    let total = |c: &Coordinator| -> u64 { c.resources().iter().map(|r| r.acquisitions()).sum() };
    let mut windows = 0;
    let mut before = total(&coordinator);
    loop {
        tokio::time::sleep(unit * 10).await;
        let after = total(&coordinator);
        if died.load(Ordering::SeqCst) == 5 {
            break;
        }
        // Someone was alive for the whole window, so someone claimed something.
        assert!(after > before, "no claim in a window of 10 units");
        before = after;
        windows += 1;
    }

    run.await.unwrap().unwrap();
    assert!(windows >= 1, "the ring should live longer than one window");
}

#[tokio::test(start_paused = true)]
async fn test_level_only_rises_when_a_feast_completes() {
    let config = mortal_config(3, 13);
    let max_refill = config.max_refill;
    let coordinator = Coordinator::new(config).unwrap();

    let over_refill = Arc::new(AtomicBool::new(false));
    {
        let over_refill = over_refill.clone();
        coordinator
            .hooks()
            .on_event(move |event| {
                if let AgentEvent::FeastFinished { gained, .. } = event {
                    if *gained > max_refill {
                        over_refill.store(true, Ordering::SeqCst);
                    }
                }
            })
            .await;
    }

    let sink = MemorySink::shared();
    coordinator.run(sink.clone()).await.unwrap();
    assert!(!over_refill.load(Ordering::SeqCst));

    let frames = sink.frames().await;
    for pair in frames.windows(2) {
        for (earlier, later) in pair[0].rows.iter().zip(&pair[1].rows) {
            let feasts = later.feasts - earlier.feasts;
            let rise = later.level - earlier.level;
            if feasts == 0 {
                assert!(
                    rise <= 0.0,
                    "agent {} rose by {} without feasting",
                    later.agent,
                    rise
                );
            } else {
                assert!(rise <= max_refill * feasts as f64);
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_observer_dead_count_matches_exited_loops() {
    let coordinator = Coordinator::new(mortal_config(4, 19)).unwrap();
    let died = Arc::new(AtomicUsize::new(0));
    {
        let died = died.clone();
        coordinator
            .hooks()
            .on_event(move |event| {
                if matches!(event, AgentEvent::Died { .. }) {
                    died.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
    }

    let sink = MemorySink::shared();
    let report = coordinator.run(sink.clone()).await.unwrap();

    assert_eq!(report.final_frame.dead_count(), 4);
    assert_eq!(died.load(Ordering::SeqCst), 4);

    let frames = sink.frames().await;
    let finished = frames.iter().filter(|frame| frame.all_dead()).count();
    assert_eq!(finished, 1, "the observer stops at the first all-dead frame");
    for pair in frames.windows(2) {
        assert!(pair[0].dead_count() <= pair[1].dead_count());
    }
}

#[tokio::test(start_paused = true)]
async fn test_agent_can_starve_under_adversarial_contention() {
    // The right-hand resource is never free when the agent looks. Starvation
    // is a legitimate outcome of the protocol, not a failure.
    let config = mortal_config(2, 0);
    let left = Arc::new(Resource::new(0));
    let right = Arc::new(Resource::new(1));
    assert!(right.acquire(HolderId(42), true).await);

    let agent = Agent::new(0, left.clone(), right.clone(), &config, StdRng::seed_from_u64(0));
    let handle = agent.handle();
    let report = agent.run().await.unwrap();

    assert_eq!(report.feasts, 0);
    assert!(report.backoffs > 0);
    assert!(!handle.is_alive());
    assert!(!left.is_held());
    assert_eq!(left.acquisitions(), report.backoffs);
}

#[tokio::test]
async fn test_release_without_acquire_is_misuse() {
    let resource = Resource::new(2);
    let err = resource.release(HolderId(0)).unwrap_err();
    assert_eq!(
        err,
        ResourceError::NotHeld {
            resource_id: 2,
            requester: HolderId(0),
        }
    );

    let wrapped: DiningError = err.into();
    assert!(wrapped.to_string().contains("Resource error"));
}
