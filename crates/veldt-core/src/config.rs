//! Environment configuration loading.
//!
//! Configuration comes from a YAML file, with environment variable
//! overrides for the network endpoint. Every section and every field has
//! a default, so an empty document (or no file at all) yields the stock
//! simulation: port 1789 on localhost, 100 grass growing by 1 per tick,
//! and no workers until the operator adds some.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veldt_types::behavior::env_keys;
use veldt_types::{AgentBehaviorConfig, AgentKind};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML was malformed or had the wrong shape.
    #[error("failed to parse config: {0}")]
    Yaml(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(err: serde_yml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Top-level environment configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Where the environment listens and workers connect.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Tick pacing and run length.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Grass economy parameters.
    #[serde(default)]
    pub ecology: EcologyConfig,
    /// Workers spawned at startup.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Behavior parameters handed to spawned workers.
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl EnvironmentConfig {
    /// Load configuration from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Yaml`] if its contents cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the text is not valid YAML or
    /// does not match the expected shape.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(text)?;
        Ok(config)
    }
}

/// Listening endpoint shared by the environment and its workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Host to bind and connect to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to bind and connect to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl NetworkConfig {
    /// `host:port` as a socket address string.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply `VELDT_HOST` / `VELDT_PORT` overrides from the process
    /// environment. Unset, empty, or unparseable values leave the
    /// configured ones alone.
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = std::env::var(env_keys::HOST)
            .ok()
            .filter(|value| !value.is_empty())
        {
            self.host = host;
        }
        if let Some(port) = std::env::var(env_keys::PORT)
            .ok()
            .and_then(|raw| raw.parse().ok())
        {
            self.port = port;
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Tick pacing and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Interval between orchestrator ticks, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Stop after this many ticks; `0` runs until told to quit.
    #[serde(default)]
    pub max_ticks: u64,
    /// How long to wait for terminated workers to exit at shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Grass economy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcologyConfig {
    /// Grass available at startup.
    #[serde(default = "default_initial_grass")]
    pub initial_grass: u64,
    /// Grass added per tick while drought is off.
    #[serde(default = "default_grass_growth")]
    pub grass_growth: u64,
    /// Grass consumed by one prey feeding.
    #[serde(default = "default_grass_unit")]
    pub grass_unit: u64,
    /// Start with grass growth suspended.
    #[serde(default)]
    pub drought: bool,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            initial_grass: default_initial_grass(),
            grass_growth: default_grass_growth(),
            grass_unit: default_grass_unit(),
            drought: false,
        }
    }
}

/// Worker processes spawned when the environment starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Prey workers to spawn at startup.
    #[serde(default)]
    pub initial_preys: u32,
    /// Predator workers to spawn at startup.
    #[serde(default)]
    pub initial_predators: u32,
}

/// Per-kind behavior parameter tables handed to spawned workers.
///
/// A table given in the file replaces that kind's defaults wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Parameters for prey workers.
    #[serde(default = "AgentBehaviorConfig::prey_defaults")]
    pub prey: AgentBehaviorConfig,
    /// Parameters for predator workers.
    #[serde(default = "AgentBehaviorConfig::predator_defaults")]
    pub predator: AgentBehaviorConfig,
}

impl AgentsConfig {
    /// Parameters for the given kind.
    #[must_use]
    pub const fn for_kind(&self, kind: AgentKind) -> AgentBehaviorConfig {
        match kind {
            AgentKind::Prey => self.prey,
            AgentKind::Predator => self.predator,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            prey: AgentBehaviorConfig::prey_defaults(),
            predator: AgentBehaviorConfig::predator_defaults(),
        }
    }
}

fn default_host() -> String {
    String::from("127.0.0.1")
}

const fn default_port() -> u16 {
    1789
}

const fn default_tick_interval_ms() -> u64 {
    200
}

const fn default_shutdown_timeout_secs() -> u64 {
    5
}

const fn default_initial_grass() -> u64 {
    100
}

const fn default_grass_growth() -> u64 {
    1
}

const fn default_grass_unit() -> u64 {
    10
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn an_empty_document_yields_defaults() {
        let config = EnvironmentConfig::parse("{}").unwrap();
        assert_eq!(config, EnvironmentConfig::default());
        assert_eq!(config.network.port, 1789);
        assert_eq!(config.ecology.initial_grass, 100);
        assert_eq!(config.simulation.tick_interval_ms, 200);
        assert_eq!(config.population.initial_preys, 0);
    }

    #[test]
    fn sections_override_independently() {
        let doc = "ecology:\n  initial_grass: 7\n  drought: true\n";
        let config = EnvironmentConfig::parse(doc).unwrap();
        assert_eq!(config.ecology.initial_grass, 7);
        assert!(config.ecology.drought);
        assert_eq!(config.ecology.grass_unit, 10);
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn agent_tables_replace_defaults_wholesale() {
        let doc = "\
agents:
  prey:
    initial_energy: 10
    energy_decay: 1
    feed_gain: 5
    hunger_threshold: 6
    repro_threshold: 8
    repro_cost: 2
    activity_chance: 1.0
    tick_interval_ms: 50
";
        let config = EnvironmentConfig::parse(doc).unwrap();
        assert_eq!(config.agents.prey.initial_energy, 10);
        assert_eq!(config.agents.prey.tick_interval_ms, 50);
        assert_eq!(
            config.agents.for_kind(AgentKind::Predator),
            AgentBehaviorConfig::predator_defaults()
        );
    }

    #[test]
    fn a_non_mapping_document_is_rejected() {
        let err = EnvironmentConfig::parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn endpoint_joins_host_and_port() {
        let network = NetworkConfig {
            host: String::from("10.0.0.5"),
            port: 4242,
        };
        assert_eq!(network.endpoint(), "10.0.0.5:4242");
    }
}
