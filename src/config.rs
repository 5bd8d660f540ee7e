// ABOUTME: Simulation configuration - timings, decay profile, ring size, and seed.
// ABOUTME: Loadable from JSON with defaults for every field, validated before use.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest accepted time unit or observer interval: one hour.
pub const MAX_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// An inclusive range of whole numbers, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRange {
    pub min: u32,
    pub max: u32,
}

impl UnitRange {
    /// Create a new inclusive range.
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Create a range that always yields `value`.
    pub const fn fixed(value: u32) -> Self {
        Self::new(value, value)
    }

    /// Draw a value uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.random_range(self.min..=self.max)
    }

    fn validate(&self, field: &'static str, floor: u32) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::invalid(
                field,
                format!("min {} exceeds max {}", self.min, self.max),
            ));
        }
        if self.min < floor {
            return Err(ConfigError::invalid(
                field,
                format!("min must be at least {}", floor),
            ));
        }
        Ok(())
    }
}

/// How a vitality tracker decays while its agent lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayProfile {
    /// Time units slept between two decay ticks.
    pub interval_units: UnitRange,
    /// Amount subtracted from the level on each tick.
    pub amount: UnitRange,
}

impl Default for DecayProfile {
    fn default() -> Self {
        Self {
            interval_units: UnitRange::new(2, 5),
            amount: UnitRange::new(5, 15),
        }
    }
}

/// Configuration for a whole simulation run.
///
/// Every duration except the observer cadence is expressed in time units,
/// scaled by `time_unit_ms`. Tests shrink the unit; the defaults run at one
/// second per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of agents (and resources) in the ring.
    pub agent_count: usize,
    /// Length of one time unit in milliseconds.
    pub time_unit_ms: u64,
    /// Time units spent thinking per cycle.
    pub think_units: UnitRange,
    /// Time units spent feasting per successful acquisition.
    pub feast_units: UnitRange,
    /// Level restored by a feast of `feast_units.max` units.
    pub max_refill: f64,
    /// Starting vitality level for every agent.
    pub initial_level: f64,
    /// Vitality decay settings.
    pub decay: DecayProfile,
    /// Observer refresh cadence in milliseconds.
    pub observer_interval_ms: u64,
    /// Root seed. A random seed is drawn (and logged) when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agent_count: 5,
            time_unit_ms: 1000,
            think_units: UnitRange::new(1, 4),
            feast_units: UnitRange::new(1, 5),
            max_refill: 14.0,
            initial_level: 100.0,
            decay: DecayProfile::default(),
            observer_interval_ms: 200,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Set the number of agents.
    pub fn agent_count(mut self, count: usize) -> Self {
        self.agent_count = count;
        self
    }

    /// Set the length of one time unit.
    pub fn time_unit(mut self, unit: Duration) -> Self {
        self.time_unit_ms = u64::try_from(unit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the thinking range.
    pub fn think_units(mut self, range: UnitRange) -> Self {
        self.think_units = range;
        self
    }

    /// Set the feasting range.
    pub fn feast_units(mut self, range: UnitRange) -> Self {
        self.feast_units = range;
        self
    }

    /// Set the maximum refill per feast.
    pub fn max_refill(mut self, refill: f64) -> Self {
        self.max_refill = refill;
        self
    }

    /// Set the starting vitality level.
    pub fn initial_level(mut self, level: f64) -> Self {
        self.initial_level = level;
        self
    }

    /// Set the decay profile.
    pub fn decay(mut self, decay: DecayProfile) -> Self {
        self.decay = decay;
        self
    }

    /// Set the observer refresh cadence.
    pub fn observer_interval(mut self, interval: Duration) -> Self {
        self.observer_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Fix the root seed for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Duration of one time unit.
    pub fn unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Duration between two observer refreshes.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.observer_interval_ms)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_count < 2 {
            return Err(ConfigError::invalid(
                "agent_count",
                "a ring needs at least two agents",
            ));
        }
        if !(1..=MAX_INTERVAL_MS).contains(&self.time_unit_ms) {
            return Err(ConfigError::invalid(
                "time_unit_ms",
                format!("{} is outside [1, {}]", self.time_unit_ms, MAX_INTERVAL_MS),
            ));
        }
        if !(1..=MAX_INTERVAL_MS).contains(&self.observer_interval_ms) {
            return Err(ConfigError::invalid(
                "observer_interval_ms",
                format!(
                    "{} is outside [1, {}]",
                    self.observer_interval_ms, MAX_INTERVAL_MS
                ),
            ));
        }
        self.think_units.validate("think_units", 0)?;
        self.feast_units.validate("feast_units", 0)?;
        if self.feast_units.max == 0 {
            return Err(ConfigError::invalid("feast_units", "max must be positive"));
        }
        self.decay.interval_units.validate("decay.interval_units", 1)?;
        self.decay.amount.validate("decay.amount", 0)?;
        if !(0.0..=100.0).contains(&self.max_refill) {
            return Err(ConfigError::invalid(
                "max_refill",
                format!("{} is outside [0, 100]", self.max_refill),
            ));
        }
        if !(self.initial_level > 0.0 && self.initial_level <= 100.0) {
            return Err(ConfigError::invalid(
                "initial_level",
                format!("{} is outside (0, 100]", self.initial_level),
            ));
        }
        Ok(())
    }
}
