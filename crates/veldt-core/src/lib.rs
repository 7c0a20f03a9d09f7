//! Core logic for the veldt environment: the authoritative state of a
//! predator/prey simulation and everything needed to mutate it safely.
//!
//! The environment process owns all shared state -- grass stock, the
//! worker roster, the reproduction wait sets -- and workers negotiate
//! every action over a line protocol. This crate holds the
//! single-threaded heart of that design; the `veldt-environment` binary
//! wires it to TCP connections, worker processes, and the operator
//! console.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with per-section defaults
//! - [`control`] -- Administrative request queue with reply routing
//! - [`dispatch`] -- The [`World`]: command handling against the ledger
//! - [`launcher`] -- Process start/stop seam and its recording stub
//! - [`ledger`] -- Tick counter and grass stock
//! - [`matcher`] -- Reproduction rendezvous wait sets
//! - [`registry`] -- Worker roster and liveness tracking

pub mod config;
pub mod control;
pub mod dispatch;
pub mod launcher;
pub mod ledger;
pub mod matcher;
pub mod registry;

pub use config::{ConfigError, EnvironmentConfig};
pub use control::{
    ControlChannel, ControlClient, ControlHandle, ControlOutcome, control_channel, handle_control,
};
pub use dispatch::{StatusSnapshot, World, spawn_worker};
pub use launcher::{LaunchError, Launcher, StubLauncher};
pub use ledger::ResourceLedger;
pub use matcher::ReproductionMatcher;
pub use registry::{AgentRecord, AgentRegistry, RegistryError};
