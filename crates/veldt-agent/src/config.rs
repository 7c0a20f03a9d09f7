//! Worker configuration from environment variables.
//!
//! The environment hands every spawned worker its parameters through
//! the variables in [`veldt_types::behavior::env_keys`]. Only the kind
//! is mandatory; everything else falls back to the kind's defaults so a
//! worker started by hand still behaves sensibly.

use std::str::FromStr;

use veldt_types::behavior::env_keys;
use veldt_types::{AgentBehaviorConfig, AgentKind};

/// Endpoint host used when the environment does not provide one.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Endpoint port used when the environment does not provide one.
const DEFAULT_PORT: u16 = 1789;

/// Ways worker configuration can fail.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AgentConfigError {
    /// The kind variable was absent.
    #[error("{} is not set; workers cannot guess their kind", env_keys::KIND)]
    MissingKind,

    /// The kind variable held an unknown token.
    #[error("unknown agent kind: {token}")]
    BadKind {
        /// The rejected kind token.
        token: String,
    },
}

/// Everything a worker needs to run: identity, endpoint, parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Which animal this worker plays.
    pub kind: AgentKind,
    /// Environment host to dial.
    pub host: String,
    /// Environment port to dial.
    pub port: u16,
    /// Behavior parameters for the tick loop.
    pub behavior: AgentBehaviorConfig,
}

impl AgentConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AgentConfigError::MissingKind`] when the kind variable
    /// is absent and [`AgentConfigError::BadKind`] when it holds an
    /// unrecognized token. All other variables fall back to defaults.
    pub fn from_env() -> Result<Self, AgentConfigError> {
        let Ok(kind_token) = std::env::var(env_keys::KIND) else {
            return Err(AgentConfigError::MissingKind);
        };
        let Some(kind) = AgentKind::from_token(kind_token.trim()) else {
            return Err(AgentConfigError::BadKind { token: kind_token });
        };

        let defaults = AgentBehaviorConfig::defaults_for(kind);
        let behavior = AgentBehaviorConfig {
            initial_energy: env_parse(env_keys::INITIAL_ENERGY, defaults.initial_energy),
            energy_decay: env_parse(env_keys::ENERGY_DECAY, defaults.energy_decay),
            feed_gain: env_parse(env_keys::FEED_GAIN, defaults.feed_gain),
            hunger_threshold: env_parse(env_keys::HUNGER_THRESHOLD, defaults.hunger_threshold),
            repro_threshold: env_parse(env_keys::REPRO_THRESHOLD, defaults.repro_threshold),
            repro_cost: env_parse(env_keys::REPRO_COST, defaults.repro_cost),
            activity_chance: env_parse(env_keys::ACTIVITY_CHANCE, defaults.activity_chance),
            tick_interval_ms: env_parse(env_keys::TICK_INTERVAL_MS, defaults.tick_interval_ms),
        };

        let host = std::env::var(env_keys::HOST)
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_HOST));

        Ok(Self {
            kind,
            host,
            port: env_parse(env_keys::PORT, DEFAULT_PORT),
            behavior,
        })
    }

    /// The `host:port` endpoint string to dial.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional raw value, keeping `fallback` on absence or junk.
fn parse_or<T: FromStr>(raw: Option<String>, fallback: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(fallback)
}

/// [`parse_or`] over one environment variable.
fn env_parse<T: FromStr>(key: &str, fallback: T) -> T {
    parse_or(std::env::var(key).ok(), fallback)
}
