// ABOUTME: Observer module - passive status polling and rendering for all agents.
// ABOUTME: Provides the Observer loop, status frames, and pluggable sinks.

mod observer;
mod sink;

pub use observer::{AgentRow, Frame, Observer, ObserverReport};
pub use sink::{ConsoleSink, MemorySink, StatusSink};
