//! Tunable behavior parameters for worker agents.
//!
//! The environment owns these values (they come from its config file) and
//! hands them to each worker it spawns through process environment
//! variables. The worker reads them back at startup, falling back to the
//! per-kind defaults when a variable is absent.

use serde::{Deserialize, Serialize};

use crate::enums::AgentKind;

/// Energy model and pacing for a single agent kind.
///
/// All energy quantities are signed: a worker whose energy drops below
/// zero dies, so the value itself may legitimately go negative for one
/// observation before the worker reports its death.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentBehaviorConfig {
    /// Energy a worker starts with.
    pub initial_energy: i64,
    /// Energy lost at the start of every active tick.
    pub energy_decay: i64,
    /// Energy gained from one successful feeding.
    pub feed_gain: i64,
    /// Below this level an active worker tries to feed.
    pub hunger_threshold: i64,
    /// Above this level an active worker tries to reproduce.
    pub repro_threshold: i64,
    /// Energy paid for requesting reproduction, granted or not.
    pub repro_cost: i64,
    /// Probability in `[0, 1]` that a worker is active on a given tick.
    pub activity_chance: f64,
    /// Pause between behavior ticks, in milliseconds.
    pub tick_interval_ms: u64,
}

impl AgentBehaviorConfig {
    /// Default parameters for prey workers.
    #[must_use]
    pub const fn prey_defaults() -> Self {
        Self {
            initial_energy: 100,
            energy_decay: 5,
            feed_gain: 50,
            hunger_threshold: 50,
            repro_threshold: 75,
            repro_cost: 10,
            activity_chance: 0.6,
            tick_interval_ms: 200,
        }
    }

    /// Default parameters for predator workers.
    #[must_use]
    pub const fn predator_defaults() -> Self {
        Self {
            initial_energy: 120,
            energy_decay: 7,
            feed_gain: 80,
            hunger_threshold: 50,
            repro_threshold: 75,
            repro_cost: 15,
            activity_chance: 0.6,
            tick_interval_ms: 200,
        }
    }

    /// Defaults for the given kind.
    #[must_use]
    pub const fn defaults_for(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Prey => Self::prey_defaults(),
            AgentKind::Predator => Self::predator_defaults(),
        }
    }
}

/// Environment variable names shared by the spawner and the workers.
///
/// The environment process exports these before launching a worker; the
/// worker's config loader reads them back. Keeping the names in one place
/// keeps the two sides from drifting.
pub mod env_keys {
    /// Which kind of agent the worker should run as (`prey` or `predator`).
    pub const KIND: &str = "VELDT_AGENT_KIND";
    /// Host the worker connects to.
    pub const HOST: &str = "VELDT_HOST";
    /// TCP port the worker connects to.
    pub const PORT: &str = "VELDT_PORT";
    /// Override for the starting energy.
    pub const INITIAL_ENERGY: &str = "VELDT_AGENT_INITIAL_ENERGY";
    /// Override for the per-tick energy decay.
    pub const ENERGY_DECAY: &str = "VELDT_AGENT_ENERGY_DECAY";
    /// Override for the energy gained per successful feeding.
    pub const FEED_GAIN: &str = "VELDT_AGENT_FEED_GAIN";
    /// Override for the hunger threshold.
    pub const HUNGER_THRESHOLD: &str = "VELDT_AGENT_HUNGER_THRESHOLD";
    /// Override for the reproduction threshold.
    pub const REPRO_THRESHOLD: &str = "VELDT_AGENT_REPRO_THRESHOLD";
    /// Override for the reproduction cost.
    pub const REPRO_COST: &str = "VELDT_AGENT_REPRO_COST";
    /// Override for the activity chance.
    pub const ACTIVITY_CHANCE: &str = "VELDT_AGENT_ACTIVITY_CHANCE";
    /// Override for the behavior tick interval.
    pub const TICK_INTERVAL_MS: &str = "VELDT_AGENT_TICK_INTERVAL_MS";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_get_distinct_defaults() {
        let prey = AgentBehaviorConfig::defaults_for(AgentKind::Prey);
        let predator = AgentBehaviorConfig::defaults_for(AgentKind::Predator);
        assert_eq!(prey, AgentBehaviorConfig::prey_defaults());
        assert_eq!(predator, AgentBehaviorConfig::predator_defaults());
        assert!(predator.initial_energy > prey.initial_energy);
        assert!(predator.energy_decay > prey.energy_decay);
    }

    #[test]
    fn reproduction_costs_less_than_threshold() {
        for kind in [AgentKind::Prey, AgentKind::Predator] {
            let cfg = AgentBehaviorConfig::defaults_for(kind);
            assert!(cfg.repro_cost < cfg.repro_threshold);
            assert!(cfg.hunger_threshold <= cfg.repro_threshold);
        }
    }
}
