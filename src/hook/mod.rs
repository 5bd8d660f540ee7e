// ABOUTME: Hook system for observing the agent lifecycle as it happens.
// ABOUTME: Provides lifecycle events, a Hook trait, and a registry that fans events out.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Events fired by an agent as it moves through its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The agent's loop started.
    Seated { agent: usize },

    /// The agent claimed a resource.
    Acquired { agent: usize, resource: usize },

    /// The agent found its second resource busy and is letting go of the first.
    BackedOff { agent: usize, resource: usize },

    /// Fired immediately before the agent releases a resource, so that a
    /// hook never sees the next holder's `Acquired` ahead of this event.
    Releasing { agent: usize, resource: usize },

    /// The agent holds both resources and starts feasting.
    FeastStarted { agent: usize, level: f64 },

    /// A feast finished and the agent's vitality was refilled.
    FeastFinished {
        agent: usize,
        units: u32,
        gained: f64,
        level: f64,
    },

    /// The agent's vitality ran out and its loop exited.
    Died { agent: usize, feasts: u64 },
}

impl AgentEvent {
    /// The agent that fired this event.
    pub fn agent(&self) -> usize {
        match self {
            AgentEvent::Seated { agent }
            | AgentEvent::Acquired { agent, .. }
            | AgentEvent::BackedOff { agent, .. }
            | AgentEvent::Releasing { agent, .. }
            | AgentEvent::FeastStarted { agent, .. }
            | AgentEvent::FeastFinished { agent, .. }
            | AgentEvent::Died { agent, .. } => *agent,
        }
    }
}

/// Trait for implementing hooks.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Called when an event occurs.
    ///
    /// Hooks observe; they cannot steer the agent. An `Err` is logged by the
    /// agent and otherwise ignored.
    async fn on_event(&self, event: &AgentEvent) -> Result<(), anyhow::Error>;

    /// Optional: Filter which events this hook cares about.
    /// Default returns true for all events.
    fn accepts(&self, event: &AgentEvent) -> bool {
        let _ = event;
        true
    }
}

/// Registry for managing and firing hooks.
pub struct HookRegistry {
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    /// Create a new empty hook registry.
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook.
    pub async fn register(&self, hook: impl Hook + 'static) {
        self.hooks.write().await.push(Arc::new(hook));
    }

    /// Register a hook wrapped in Arc.
    pub async fn register_arc(&self, hook: Arc<dyn Hook>) {
        self.hooks.write().await.push(hook);
    }

    /// Register a closure that sees every event.
    pub async fn on_event<F>(&self, f: F)
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.register(FnHook { callback: f }).await;
    }

    /// Fire an event to all registered hooks that accept it.
    ///
    /// Every hook sees the event even if an earlier one fails; the first
    /// failure is returned.
    pub async fn fire(&self, event: &AgentEvent) -> Result<(), anyhow::Error> {
        let hooks = self.hooks.read().await;
        let mut first_error = None;

        for hook in hooks.iter() {
            if !hook.accepts(event) {
                continue;
            }
            if let Err(e) = hook.on_event(event).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Get the number of registered hooks.
    pub async fn len(&self) -> usize {
        self.hooks.read().await.len()
    }

    /// Check if the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.hooks.read().await.is_empty()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct FnHook<F> {
    callback: F,
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&AgentEvent) + Send + Sync + 'static,
{
    async fn on_event(&self, event: &AgentEvent) -> Result<(), anyhow::Error> {
        (self.callback)(event);
        Ok(())
    }
}
