//! Worker process lifecycle for the environment.
//!
//! [`ProcessLauncher`] is the production [`Launcher`]: it forks one OS
//! process per animal, hands each its behavior parameters through the
//! environment variables in [`veldt_types::behavior::env_keys`], and
//! delivers termination as `SIGTERM`. Children are tracked so exits can
//! be reaped each tick and stragglers killed at shutdown.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use veldt_core::config::AgentsConfig;
use veldt_core::{LaunchError, Launcher};
use veldt_types::behavior::{AgentBehaviorConfig, env_keys};
use veldt_types::{AgentKind, WorkerId};

use crate::error::EnvironmentError;

// -----------------------------------------------------------------------
// Binary discovery
// -----------------------------------------------------------------------

/// Environment variable that overrides agent binary discovery.
pub const AGENT_BINARY_ENV: &str = "VELDT_AGENT_BIN";

/// Find the worker binary to execute.
///
/// `VELDT_AGENT_BIN` wins when set and non-empty; otherwise the binary
/// is expected to sit next to the environment executable, which is
/// where cargo places workspace siblings.
fn locate_agent_binary() -> std::io::Result<PathBuf> {
    if let Some(path) = std::env::var(AGENT_BINARY_ENV).ok().filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| std::io::Error::other("environment executable has no parent directory"))?;
    Ok(dir.join("veldt-agent"))
}

/// Environment variables carrying one kind's behavior parameters.
fn behavior_env(behavior: &AgentBehaviorConfig) -> Vec<(&'static str, String)> {
    vec![
        (env_keys::INITIAL_ENERGY, behavior.initial_energy.to_string()),
        (env_keys::ENERGY_DECAY, behavior.energy_decay.to_string()),
        (env_keys::FEED_GAIN, behavior.feed_gain.to_string()),
        (env_keys::HUNGER_THRESHOLD, behavior.hunger_threshold.to_string()),
        (env_keys::REPRO_THRESHOLD, behavior.repro_threshold.to_string()),
        (env_keys::REPRO_COST, behavior.repro_cost.to_string()),
        (env_keys::ACTIVITY_CHANCE, behavior.activity_chance.to_string()),
        (env_keys::TICK_INTERVAL_MS, behavior.tick_interval_ms.to_string()),
    ]
}

// -----------------------------------------------------------------------
// Launcher
// -----------------------------------------------------------------------

/// Starts and stops real worker processes.
///
/// Worker identifiers are the children's OS process ids, which is also
/// how workers introduce themselves in their `JOIN` lines.
#[derive(Debug)]
pub struct ProcessLauncher {
    binary: PathBuf,
    endpoint: SocketAddr,
    agents: AgentsConfig,
    children: BTreeMap<WorkerId, Child>,
}

impl ProcessLauncher {
    /// Create a launcher that points workers at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::AgentBinary`] when the worker binary
    /// cannot be located.
    pub fn new(agents: AgentsConfig, endpoint: SocketAddr) -> Result<Self, EnvironmentError> {
        let binary =
            locate_agent_binary().map_err(|source| EnvironmentError::AgentBinary { source })?;
        info!(binary = %binary.display(), "agent binary located");
        Ok(Self {
            binary,
            endpoint,
            agents,
            children: BTreeMap::new(),
        })
    }

    /// Terminate every remaining worker and wait for the exits.
    ///
    /// Sends `SIGTERM` to all tracked children, then waits up to
    /// `timeout` for each before falling back to a kill.
    pub async fn shutdown(mut self, timeout: Duration) {
        let ids: Vec<WorkerId> = self.children.keys().copied().collect();
        for id in ids {
            if let Err(err) = self.terminate(id) {
                warn!(%id, error = %err, "failed to signal worker during shutdown");
            }
        }
        for (id, mut child) in self.children {
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(Ok(status)) => debug!(%id, %status, "worker exited"),
                Ok(Err(err)) => warn!(%id, error = %err, "failed to wait for worker"),
                Err(_elapsed) => {
                    warn!(%id, "worker ignored SIGTERM, killing");
                    if let Err(err) = child.kill().await {
                        warn!(%id, error = %err, "failed to kill worker");
                    }
                }
            }
        }
    }
}

impl Launcher for ProcessLauncher {
    fn spawn(&mut self, kind: AgentKind) -> Result<WorkerId, LaunchError> {
        let behavior = self.agents.for_kind(kind);
        let mut command = Command::new(&self.binary);
        command
            .env(env_keys::KIND, kind.token())
            .env(env_keys::HOST, self.endpoint.ip().to_string())
            .env(env_keys::PORT, self.endpoint.port().to_string())
            .envs(behavior_env(&behavior))
            .stdin(Stdio::null())
            // Last-resort cleanup if the environment itself dies.
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| LaunchError::Spawn { kind, source })?;
        let Some(pid) = child.id() else {
            return Err(LaunchError::Spawn {
                kind,
                source: std::io::Error::other("worker exited before reporting a pid"),
            });
        };
        let id = WorkerId::from_raw(pid);
        info!(%id, kind = kind.label(), "worker process started");
        self.children.insert(id, child);
        Ok(id)
    }

    fn terminate(&mut self, id: WorkerId) -> Result<(), LaunchError> {
        let Ok(pid) = i32::try_from(id.get()) else {
            return Err(LaunchError::Terminate {
                id,
                message: String::from("process id out of signalable range"),
            });
        };
        match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
            // ESRCH means the worker is already gone, which is what the
            // request wanted.
            Ok(()) | Err(Errno::ESRCH) => {
                debug!(%id, "termination signalled");
                Ok(())
            }
            Err(err) => Err(LaunchError::Terminate {
                id,
                message: err.to_string(),
            }),
        }
    }

    fn reap(&mut self) {
        self.children.retain(|id, child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(%id, %status, "worker process exited");
                false
            }
            Ok(None) => true,
            Err(err) => {
                warn!(%id, error = %err, "failed to poll worker process");
                true
            }
        });
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
