//! Worker roster and liveness tracking.
//!
//! Every worker that ever joins gets a permanent record; death flips the
//! record's liveness instead of removing it. That is what lets the
//! environment refuse identifier reuse and acknowledge late death
//! reports idempotently.

use std::collections::BTreeMap;

use veldt_types::{AgentKind, WorkerId};

/// Errors raised when admitting a worker to the roster.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The identifier was used by a worker that has since died.
    #[error("worker {0} is already recorded as dead")]
    DeadWorker(WorkerId),
}

/// One tracked worker: its declared kind and whether it still lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentRecord {
    kind: AgentKind,
    alive: bool,
}

impl AgentRecord {
    /// The kind the worker declared when joining.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Whether the worker is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Roster of every worker that has ever joined, keyed by identifier.
///
/// Records are never removed, and `BTreeMap` ordering doubles as the
/// tie-break wherever one live worker must be picked (lowest identifier
/// first).
#[derive(Debug, Default)]
pub struct AgentRegistry {
    records: BTreeMap<WorkerId, AgentRecord>,
}

impl AgentRegistry {
    /// Create an empty roster.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Admit a worker, creating or overwriting its record as alive.
    ///
    /// Re-joining while alive is a harmless re-announcement. Joining with
    /// the identifier of a dead worker is refused: identifiers are never
    /// resurrected.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DeadWorker`] if the identifier belongs to
    /// a worker already recorded as dead.
    pub fn join(&mut self, id: WorkerId, kind: AgentKind) -> Result<(), RegistryError> {
        if let Some(record) = self.records.get(&id) {
            if !record.alive {
                return Err(RegistryError::DeadWorker(id));
            }
        }
        self.records.insert(id, AgentRecord { kind, alive: true });
        Ok(())
    }

    /// Flip a worker to dead.
    ///
    /// Returns `true` only on a live-to-dead transition; unknown and
    /// already-dead identifiers return `false`.
    pub fn mark_dead(&mut self, id: WorkerId) -> bool {
        match self.records.get_mut(&id) {
            Some(record) if record.alive => {
                record.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Whether the identifier is known and alive.
    #[must_use]
    pub fn is_alive(&self, id: WorkerId) -> bool {
        self.records.get(&id).is_some_and(AgentRecord::is_alive)
    }

    /// Look up a worker's record.
    #[must_use]
    pub fn get(&self, id: WorkerId) -> Option<AgentRecord> {
        self.records.get(&id).copied()
    }

    /// Number of live workers of the given kind.
    #[must_use]
    pub fn alive_count(&self, kind: AgentKind) -> usize {
        self.records
            .values()
            .filter(|record| record.alive && record.kind == kind)
            .count()
    }

    /// Lowest-identifier live worker of the given kind, if any.
    #[must_use]
    pub fn first_live(&self, kind: AgentKind) -> Option<WorkerId> {
        self.records
            .iter()
            .find(|(_, record)| record.alive && record.kind == kind)
            .map(|(id, _)| *id)
    }
}
