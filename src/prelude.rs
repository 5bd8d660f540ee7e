// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use dining::prelude::*;` to get started quickly.

pub use crate::agent::{Agent, AgentHandle, AgentReport, AgentStatus, Phase};
pub use crate::config::{DecayProfile, SimulationConfig, UnitRange};
pub use crate::coordinator::{Coordinator, SimulationReport};
pub use crate::error::{ConfigError, DiningError, ResourceError};
pub use crate::hook::{AgentEvent, Hook, HookRegistry};
pub use crate::observer::{
    AgentRow, ConsoleSink, Frame, MemorySink, Observer, ObserverReport, StatusSink,
};
pub use crate::resource::{Claim, HolderId, Resource};
pub use crate::vitality::{MAX_LEVEL, MIN_LEVEL, VitalityTracker};
