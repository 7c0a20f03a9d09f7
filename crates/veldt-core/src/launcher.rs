//! Worker process launching seam and stub implementation.
//!
//! A matched reproduction, an operator `ADD_*` action, and a death or
//! predation all end in a request to start or stop an OS process. The
//! [`Launcher`] trait abstracts that capability so dispatch logic can be
//! exercised without forking anything -- the production implementation
//! lives in the environment binary, while tests use [`StubLauncher`] to
//! observe requests in-process.

use veldt_types::{AgentKind, WorkerId};

/// Errors raised while starting or stopping worker processes.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The worker binary could not be started.
    #[error("failed to spawn {kind} worker: {source}")]
    Spawn {
        /// The kind that was requested.
        kind: AgentKind,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Delivering a termination request failed.
    #[error("failed to terminate worker {id}: {message}")]
    Terminate {
        /// The worker the request addressed.
        id: WorkerId,
        /// Description of the failure.
        message: String,
    },
}

/// A capability for starting and stopping worker processes.
///
/// The dispatcher only ever needs two operations: start one worker of a
/// given kind and deliver a termination request to an existing one. Both
/// are fire-and-forget from the ledger's point of view -- a failure is
/// logged by the caller and never rolled back.
pub trait Launcher {
    /// Start one new worker of `kind` and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Spawn`] if the process could not be
    /// started.
    fn spawn(&mut self, kind: AgentKind) -> Result<WorkerId, LaunchError>;

    /// Deliver a termination request to the worker.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Terminate`] if the request could not be
    /// delivered.
    fn terminate(&mut self, id: WorkerId) -> Result<(), LaunchError>;

    /// Collect exit statuses of workers that have already finished.
    ///
    /// Called once per tick by the environment loop. The default does
    /// nothing; launchers that track real child processes override it.
    fn reap(&mut self) {}
}

/// A launcher that records requests instead of touching the OS.
///
/// Hands out sequential identifiers starting at 1000 so that spawned
/// identifiers stay visually distinct from the hand-picked ones tests
/// use for pre-existing workers.
#[derive(Debug)]
pub struct StubLauncher {
    next_raw: u32,
    spawned: Vec<AgentKind>,
    terminated: Vec<WorkerId>,
    fail_spawns: bool,
}

impl StubLauncher {
    /// Create a recording launcher whose requests all succeed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_raw: 1000,
            spawned: Vec::new(),
            terminated: Vec::new(),
            fail_spawns: false,
        }
    }

    /// Create a recording launcher whose spawn requests all fail.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            next_raw: 1000,
            spawned: Vec::new(),
            terminated: Vec::new(),
            fail_spawns: true,
        }
    }

    /// Kinds spawned so far, in request order.
    #[must_use]
    pub fn spawned(&self) -> &[AgentKind] {
        &self.spawned
    }

    /// Identifiers asked to terminate, in request order.
    #[must_use]
    pub fn terminated(&self) -> &[WorkerId] {
        &self.terminated
    }
}

impl Default for StubLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher for StubLauncher {
    fn spawn(&mut self, kind: AgentKind) -> Result<WorkerId, LaunchError> {
        if self.fail_spawns {
            return Err(LaunchError::Spawn {
                kind,
                source: std::io::Error::other("stubbed spawn failure"),
            });
        }
        let id = WorkerId::from_raw(self.next_raw);
        self.next_raw = self.next_raw.saturating_add(1);
        self.spawned.push(kind);
        Ok(id)
    }

    fn terminate(&mut self, id: WorkerId) -> Result<(), LaunchError> {
        self.terminated.push(id);
        Ok(())
    }
}
