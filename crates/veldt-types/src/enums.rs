//! Enumeration types for the veldt simulation.

use serde::{Deserialize, Serialize};

/// The kind of animal a worker represents.
///
/// The kind decides which side of the food chain a worker is on: prey graze
/// the shared grass stock, predators eat live prey. It also selects the
/// per-kind behavior constants (energy decay, feed gain, thresholds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// A grazer. Feeds on the environment's grass stock.
    Prey,
    /// A hunter. Feeds by consuming one live prey.
    Predator,
}

impl AgentKind {
    /// The upper-case wire token (`PREY` / `PREDATOR`).
    pub const fn token(self) -> &'static str {
        match self {
            Self::Prey => "PREY",
            Self::Predator => "PREDATOR",
        }
    }

    /// The lower-case label used in log lines and control replies
    /// (`prey` / `predator`).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Prey => "prey",
            Self::Predator => "predator",
        }
    }

    /// Parse the upper-case wire token. Anything else is `None`; the wire
    /// grammar does not accept lower- or mixed-case kinds.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "PREY" => Some(Self::Prey),
            "PREDATOR" => Some(Self::Predator),
            _ => None,
        }
    }
}

impl core::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        assert_eq!(AgentKind::from_token("PREY"), Some(AgentKind::Prey));
        assert_eq!(AgentKind::from_token("PREDATOR"), Some(AgentKind::Predator));
        assert_eq!(AgentKind::Prey.token(), "PREY");
        assert_eq!(AgentKind::Predator.to_string(), "PREDATOR");
    }

    #[test]
    fn case_is_strict() {
        assert_eq!(AgentKind::from_token("prey"), None);
        assert_eq!(AgentKind::from_token("Predator"), None);
        assert_eq!(AgentKind::from_token(""), None);
    }

    #[test]
    fn labels_are_lowercase() {
        assert_eq!(AgentKind::Prey.label(), "prey");
        assert_eq!(AgentKind::Predator.label(), "predator");
    }
}
