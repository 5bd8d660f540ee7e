// ABOUTME: Agent module - per-seat lifecycle state machine competing for resources.
// ABOUTME: Provides the Agent loop, its read-only AgentHandle, and lifecycle status.

mod agent;
mod status;

pub use agent::{Agent, AgentHandle, AgentReport};
pub use status::{AgentStatus, Phase};
