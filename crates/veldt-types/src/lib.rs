//! Shared type definitions for the veldt simulation.
//!
//! This crate is the single source of truth for everything that crosses a
//! process boundary: worker identifiers, animal kinds, the line-based
//! wire grammar spoken between workers and the environment, the
//! administrative control-channel request form, and the behavior
//! parameters the environment hands to the workers it spawns.
//!
//! # Modules
//!
//! - [`ids`] -- Newtype identifiers for workers and control-channel requesters
//! - [`enums`] -- The animal kind enumeration
//! - [`wire`] -- Request/reply grammar: parsing and rendering of protocol lines
//! - [`behavior`] -- Per-kind energy model parameters and their env var names

pub mod behavior;
pub mod enums;
pub mod ids;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use behavior::AgentBehaviorConfig;
pub use enums::AgentKind;
pub use ids::{RequesterId, WorkerId};
pub use wire::{Command, ControlAction, ControlParseError, ControlRequest, Reply, WireError};
