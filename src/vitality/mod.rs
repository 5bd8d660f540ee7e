// ABOUTME: Vitality module - per-agent time-decaying level that bounds its lifetime.
// ABOUTME: Runs an independent decay task that the owning agent stops on death.

mod tracker;

pub use tracker::{MAX_LEVEL, MIN_LEVEL, VitalityTracker};
