//! Command dispatch against the environment's authoritative state.
//!
//! One [`World`], owned by the orchestrator task, holds the ledger, the
//! roster, and the reproduction wait sets. Every protocol line from a
//! worker and every administrative action funnels through it on a single
//! thread; nothing else mutates simulation state.

use std::fmt;

use tracing::{debug, info, warn};
use veldt_types::{AgentKind, Command, Reply, WorkerId};

use crate::config::EcologyConfig;
use crate::launcher::Launcher;
use crate::ledger::ResourceLedger;
use crate::matcher::ReproductionMatcher;
use crate::registry::AgentRegistry;

/// Point-in-time summary of the resource ledger, served to `STATUS`.
///
/// The `Display` form is the exact reply line sent over the control
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Completed ticks.
    pub tick: u64,
    /// Live predator workers.
    pub predators: usize,
    /// Live prey workers.
    pub preys: usize,
    /// Grass currently available.
    pub grass: u64,
    /// Whether grass growth is suspended.
    pub drought: bool,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick={} predators={} preys={} grass={} drought={}",
            self.tick, self.predators, self.preys, self.grass, self.drought
        )
    }
}

/// The single authority over simulation state.
///
/// Owns the ledger, the worker roster, and the reproduction wait sets.
/// Commands mutate it one at a time from the orchestrator's tick loop.
/// Spawn and terminate side effects go through the [`Launcher`] passed
/// into each dispatch; their failures are logged and never rolled back,
/// so the ledger always reflects the intended outcome.
#[derive(Debug)]
pub struct World {
    ledger: ResourceLedger,
    registry: AgentRegistry,
    matcher: ReproductionMatcher,
    grass_growth: u64,
    grass_unit: u64,
}

impl World {
    /// Create a world from the ecology section of the configuration.
    #[must_use]
    pub const fn new(ecology: &EcologyConfig) -> Self {
        Self {
            ledger: ResourceLedger::new(ecology.initial_grass, ecology.drought),
            registry: AgentRegistry::new(),
            matcher: ReproductionMatcher::new(),
            grass_growth: ecology.grass_growth,
            grass_unit: ecology.grass_unit,
        }
    }

    /// Advance the tick counter, growing grass unless drought is active.
    pub fn advance_tick(&mut self) {
        self.ledger.advance(self.grass_growth);
        debug!(
            tick = self.ledger.tick(),
            grass = self.ledger.grass(),
            "tick advanced"
        );
    }

    /// Snapshot the ledger for a `STATUS` reply or a log line.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            tick: self.ledger.tick(),
            predators: self.registry.alive_count(AgentKind::Predator),
            preys: self.registry.alive_count(AgentKind::Prey),
            grass: self.ledger.grass(),
            drought: self.ledger.drought(),
        }
    }

    /// The resource ledger.
    #[must_use]
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// The worker roster.
    #[must_use]
    pub const fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Parse and apply one worker line, producing the reply to send back.
    ///
    /// Malformed lines mutate nothing and come back as `ERR`.
    pub fn dispatch_line(&mut self, launcher: &mut dyn Launcher, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(command) => self.dispatch(launcher, command),
            Err(err) => {
                warn!(line, %err, "rejected worker line");
                Reply::from(err)
            }
        }
    }

    /// Apply one parsed command.
    pub fn dispatch(&mut self, launcher: &mut dyn Launcher, command: Command) -> Reply {
        match command {
            Command::Join { kind, id } => self.join(kind, id),
            Command::Feed {
                kind: AgentKind::Prey,
                id,
            } => self.graze(id),
            Command::Feed {
                kind: AgentKind::Predator,
                id,
            } => self.hunt(launcher, id),
            Command::Repro { kind, id } => self.reproduce(launcher, kind, id),
            Command::Die { kind, id } => self.bury(launcher, kind, id),
        }
    }

    fn join(&mut self, kind: AgentKind, id: WorkerId) -> Reply {
        match self.registry.join(id, kind) {
            Ok(()) => {
                info!(
                    worker = %id,
                    %kind,
                    alive = self.registry.alive_count(kind),
                    "worker joined"
                );
                Reply::OkJoin
            }
            Err(err) => {
                warn!(worker = %id, %kind, %err, "join refused");
                Reply::Error {
                    message: err.to_string(),
                }
            }
        }
    }

    fn graze(&mut self, id: WorkerId) -> Reply {
        if self.ledger.consume_grass(self.grass_unit) {
            debug!(worker = %id, grass = self.ledger.grass(), "prey grazed");
            Reply::OkFeedGrass
        } else {
            debug!(worker = %id, "grass exhausted");
            Reply::NoGrass
        }
    }

    fn hunt(&mut self, launcher: &mut dyn Launcher, id: WorkerId) -> Reply {
        let Some(victim) = self.registry.first_live(AgentKind::Prey) else {
            debug!(predator = %id, "no live prey to hunt");
            return Reply::NoPrey;
        };
        self.matcher.remove(victim);
        if self.registry.mark_dead(victim) {
            info!(predator = %id, prey = %victim, "prey eaten");
            terminate_worker(launcher, victim);
        }
        Reply::OkFeedPrey
    }

    fn reproduce(&mut self, launcher: &mut dyn Launcher, kind: AgentKind, id: WorkerId) -> Reply {
        if !self.registry.is_alive(id) {
            debug!(worker = %id, %kind, "reproduction request from unknown worker");
            return Reply::OkReproWaiting;
        }
        self.matcher.insert(kind, id);
        if let Some((first, second)) = self.matcher.pop_pair(kind) {
            info!(%kind, parent_a = %first, parent_b = %second, "reproduction matched");
            spawn_worker(launcher, kind);
            Reply::OkReproBirth
        } else {
            debug!(
                worker = %id,
                %kind,
                waiting = self.matcher.waiting(kind),
                "reproduction waiting"
            );
            Reply::OkReproWaiting
        }
    }

    fn bury(&mut self, launcher: &mut dyn Launcher, kind: AgentKind, id: WorkerId) -> Reply {
        self.matcher.remove(id);
        if self.registry.mark_dead(id) {
            info!(
                worker = %id,
                %kind,
                remaining = self.registry.alive_count(kind),
                "worker died"
            );
            terminate_worker(launcher, id);
        } else {
            debug!(worker = %id, %kind, "death report for unknown worker");
        }
        Reply::OkDie
    }
}

/// Ask the launcher for one more worker of `kind`, logging the outcome.
///
/// A failed spawn is logged and otherwise dropped; the ledger is never
/// rolled back on process faults.
pub fn spawn_worker(launcher: &mut dyn Launcher, kind: AgentKind) {
    match launcher.spawn(kind) {
        Ok(child) => info!(%kind, worker = %child, "spawned worker"),
        Err(err) => warn!(%kind, %err, "spawn failed"),
    }
}

fn terminate_worker(launcher: &mut dyn Launcher, id: WorkerId) {
    if let Err(err) = launcher.terminate(id) {
        warn!(worker = %id, %err, "terminate failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::launcher::StubLauncher;

    fn world() -> World {
        World::new(&EcologyConfig::default())
    }

    fn id(raw: u32) -> WorkerId {
        WorkerId::from_raw(raw)
    }

    fn join(world: &mut World, launcher: &mut StubLauncher, kind: AgentKind, raw: u32) {
        let reply = world.dispatch(launcher, Command::Join { kind, id: id(raw) });
        assert_eq!(reply, Reply::OkJoin);
    }

    #[test]
    fn status_tracks_joins_and_ticks() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 11);
        join(&mut world, &mut launcher, AgentKind::Predator, 12);
        world.advance_tick();
        let status = world.status();
        assert_eq!(
            status.to_string(),
            "tick=1 predators=1 preys=1 grass=101 drought=false"
        );
    }

    #[test]
    fn dead_identifiers_cannot_rejoin() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 7);
        let reply = world.dispatch(
            &mut launcher,
            Command::Die {
                kind: AgentKind::Prey,
                id: id(7),
            },
        );
        assert_eq!(reply, Reply::OkDie);
        let reply = world.dispatch(
            &mut launcher,
            Command::Join {
                kind: AgentKind::Prey,
                id: id(7),
            },
        );
        assert!(matches!(reply, Reply::Error { .. }));
        assert_eq!(world.status().preys, 0);
    }

    #[test]
    fn grazing_spends_grass_in_units() {
        let ecology = EcologyConfig {
            initial_grass: 25,
            grass_growth: 0,
            grass_unit: 10,
            drought: false,
        };
        let mut world = World::new(&ecology);
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 3);
        let feed = Command::Feed {
            kind: AgentKind::Prey,
            id: id(3),
        };
        assert_eq!(world.dispatch(&mut launcher, feed), Reply::OkFeedGrass);
        assert_eq!(world.dispatch(&mut launcher, feed), Reply::OkFeedGrass);
        assert_eq!(world.dispatch(&mut launcher, feed), Reply::NoGrass);
        assert_eq!(world.status().grass, 5);
    }

    #[test]
    fn predation_takes_the_lowest_live_prey() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 9);
        join(&mut world, &mut launcher, AgentKind::Prey, 4);
        join(&mut world, &mut launcher, AgentKind::Prey, 6);
        join(&mut world, &mut launcher, AgentKind::Predator, 2);
        let hunt = Command::Feed {
            kind: AgentKind::Predator,
            id: id(2),
        };
        assert_eq!(world.dispatch(&mut launcher, hunt), Reply::OkFeedPrey);
        assert_eq!(launcher.terminated(), [id(4)]);
        assert_eq!(world.status().preys, 2);
        assert_eq!(world.dispatch(&mut launcher, hunt), Reply::OkFeedPrey);
        assert_eq!(launcher.terminated(), [id(4), id(6)]);
    }

    #[test]
    fn predation_without_prey_reports_none() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Predator, 2);
        let reply = world.dispatch(
            &mut launcher,
            Command::Feed {
                kind: AgentKind::Predator,
                id: id(2),
            },
        );
        assert_eq!(reply, Reply::NoPrey);
        assert!(launcher.terminated().is_empty());
    }

    #[test]
    fn reproduction_pairs_two_waiters() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 5);
        join(&mut world, &mut launcher, AgentKind::Prey, 8);
        let repro_five = Command::Repro {
            kind: AgentKind::Prey,
            id: id(5),
        };
        let repro_eight = Command::Repro {
            kind: AgentKind::Prey,
            id: id(8),
        };
        assert_eq!(
            world.dispatch(&mut launcher, repro_five),
            Reply::OkReproWaiting
        );
        assert_eq!(
            world.dispatch(&mut launcher, repro_eight),
            Reply::OkReproBirth
        );
        assert_eq!(launcher.spawned(), [AgentKind::Prey]);
        // The wait set drained; the next request starts a fresh pairing.
        assert_eq!(
            world.dispatch(&mut launcher, repro_five),
            Reply::OkReproWaiting
        );
    }

    #[test]
    fn unknown_workers_never_enter_the_rendezvous() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 5);
        let reply = world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(8),
            },
        );
        assert_eq!(reply, Reply::OkReproWaiting);
        let reply = world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(5),
            },
        );
        assert_eq!(reply, Reply::OkReproWaiting);
        assert!(launcher.spawned().is_empty());
    }

    #[test]
    fn death_withdraws_a_pending_reproduction() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 5);
        join(&mut world, &mut launcher, AgentKind::Prey, 8);
        world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(5),
            },
        );
        world.dispatch(
            &mut launcher,
            Command::Die {
                kind: AgentKind::Prey,
                id: id(5),
            },
        );
        let reply = world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(8),
            },
        );
        assert_eq!(reply, Reply::OkReproWaiting);
        assert!(launcher.spawned().is_empty());
    }

    #[test]
    fn eaten_prey_is_withdrawn_from_the_rendezvous() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 5);
        join(&mut world, &mut launcher, AgentKind::Prey, 8);
        join(&mut world, &mut launcher, AgentKind::Predator, 2);
        world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(5),
            },
        );
        world.dispatch(
            &mut launcher,
            Command::Feed {
                kind: AgentKind::Predator,
                id: id(2),
            },
        );
        let reply = world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(8),
            },
        );
        assert_eq!(reply, Reply::OkReproWaiting);
        assert!(launcher.spawned().is_empty());
    }

    #[test]
    fn death_is_acknowledged_idempotently() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 7);
        let die = Command::Die {
            kind: AgentKind::Prey,
            id: id(7),
        };
        assert_eq!(world.dispatch(&mut launcher, die), Reply::OkDie);
        assert_eq!(world.dispatch(&mut launcher, die), Reply::OkDie);
        let unknown = Command::Die {
            kind: AgentKind::Prey,
            id: id(99),
        };
        assert_eq!(world.dispatch(&mut launcher, unknown), Reply::OkDie);
        // Only the live-to-dead transition requested a termination.
        assert_eq!(launcher.terminated(), [id(7)]);
    }

    #[test]
    fn malformed_lines_get_err_without_mutation() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        let reply = world.dispatch_line(&mut launcher, "MUNCH PREY 5");
        assert!(matches!(reply, Reply::Error { .. }));
        assert_eq!(world.status().preys, 0);
    }

    #[test]
    fn lines_round_trip_through_dispatch() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        let reply = world.dispatch_line(&mut launcher, "JOIN PREY 21");
        assert_eq!(reply, Reply::OkJoin);
        assert_eq!(reply.to_string(), "OK JOIN");
        assert_eq!(world.status().preys, 1);
    }

    #[test]
    fn a_full_meadow_feeds_exactly_ten_grazings() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 31);
        for _ in 0..10 {
            let reply = world.dispatch_line(&mut launcher, "FEED PREY 31");
            assert_eq!(reply.to_string(), "OK FEED GRASS");
        }
        let reply = world.dispatch_line(&mut launcher, "FEED PREY 31");
        assert_eq!(reply.to_string(), "NO NO_GRASS");
        assert_eq!(world.status().grass, 0);
    }

    #[test]
    fn a_hunt_kills_and_terminates_the_victim() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        assert_eq!(
            world.dispatch_line(&mut launcher, "JOIN PREDATOR 5").to_string(),
            "OK JOIN"
        );
        assert_eq!(
            world.dispatch_line(&mut launcher, "JOIN PREY 6").to_string(),
            "OK JOIN"
        );
        assert_eq!(
            world.dispatch_line(&mut launcher, "FEED PREDATOR 5").to_string(),
            "OK FEED PREY"
        );
        assert_eq!(launcher.terminated(), [id(6)]);
        assert_eq!(world.status().preys, 0);
        assert_eq!(world.status().predators, 1);
        // The victim's record stays behind, marked dead; its id is burned.
        let reply = world.dispatch_line(&mut launcher, "JOIN PREY 6");
        assert!(matches!(reply, Reply::Error { .. }));
    }

    #[test]
    fn a_birth_counts_once_the_newborn_joins() {
        let mut world = world();
        let mut launcher = StubLauncher::new();
        join(&mut world, &mut launcher, AgentKind::Prey, 5);
        join(&mut world, &mut launcher, AgentKind::Prey, 8);
        world.dispatch_line(&mut launcher, "REPRO PREY 5");
        let reply = world.dispatch_line(&mut launcher, "REPRO PREY 8");
        assert_eq!(reply.to_string(), "OK REPRO BIRTH");
        assert_eq!(launcher.spawned(), [AgentKind::Prey]);
        // The count moves only when the newborn checks in for itself.
        assert_eq!(world.status().preys, 2);
        let reply = world.dispatch_line(&mut launcher, "JOIN PREY 1000");
        assert_eq!(reply, Reply::OkJoin);
        assert_eq!(world.status().preys, 3);
    }

    #[test]
    fn failed_spawns_leave_the_ledger_alone() {
        let mut world = world();
        let mut launcher = StubLauncher::failing();
        join(&mut world, &mut launcher, AgentKind::Prey, 5);
        join(&mut world, &mut launcher, AgentKind::Prey, 8);
        world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(5),
            },
        );
        let reply = world.dispatch(
            &mut launcher,
            Command::Repro {
                kind: AgentKind::Prey,
                id: id(8),
            },
        );
        // The birth is still reported; the failure is only logged.
        assert_eq!(reply, Reply::OkReproBirth);
        assert!(launcher.spawned().is_empty());
        assert_eq!(world.status().preys, 2);
    }
}
