// ABOUTME: Coordinator module - wires resources, agents, and the observer into a ring.
// ABOUTME: Contains ring construction, seeding, and the top-level run loop.

mod coordinator;

pub use coordinator::{Coordinator, SimulationReport};
