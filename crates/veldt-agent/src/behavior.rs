//! The per-tick energy state machine.
//!
//! Pure logic, no I/O: each tick the worker draws whether it is active,
//! pays its energy decay, and decides which requests to send. The
//! network layer carries the requests and feeds replies back in. This
//! split keeps the whole survival policy testable without a socket.

use rand::Rng;
use veldt_types::{AgentBehaviorConfig, Reply};

/// What one tick asks the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPlan {
    /// Energy went negative: announce death and exit.
    Die,
    /// Stay alive; send the flagged requests in order.
    Live {
        /// Enter the reproduction rendezvous this tick.
        repro: bool,
        /// Ask to feed this tick.
        feed: bool,
    },
}

/// The mutable state of one animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentState {
    tick: u64,
    energy: i64,
    active: bool,
}

impl AgentState {
    /// Fresh state with the configured starting energy.
    #[must_use]
    pub const fn new(behavior: &AgentBehaviorConfig) -> Self {
        Self {
            tick: 0,
            energy: behavior.initial_energy,
            active: true,
        }
    }

    /// Current energy reserve.
    #[must_use]
    pub const fn energy(&self) -> i64 {
        self.energy
    }

    /// Ticks lived so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether the last activity draw came up active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Advance one tick and decide what to send.
    ///
    /// The activity draw and the decay happen unconditionally. Death
    /// wins over everything else. Reproduction is attempted while
    /// energetic and costs its fee up front, found partner or not;
    /// feeding is attempted while hungry, with the gain applied only
    /// once the environment confirms (see [`Self::apply_feed_reply`]).
    /// A passive tick sends nothing and just decays.
    pub fn plan_tick(&mut self, behavior: &AgentBehaviorConfig, rng: &mut impl Rng) -> TickPlan {
        self.tick = self.tick.saturating_add(1);
        self.active = rng.random_bool(behavior.activity_chance.clamp(0.0, 1.0));
        self.energy = self.energy.saturating_sub(behavior.energy_decay);

        if self.energy < 0 {
            return TickPlan::Die;
        }

        let repro = self.active && self.energy > behavior.repro_threshold;
        if repro {
            self.energy = self.energy.saturating_sub(behavior.repro_cost);
        }
        let feed = self.active && self.energy < behavior.hunger_threshold;

        TickPlan::Live { repro, feed }
    }

    /// Apply the environment's answer to a feed request.
    ///
    /// Only an `OK` reply earns the gain; `NO` and `ERR` leave the
    /// reserve untouched.
    pub const fn apply_feed_reply(&mut self, behavior: &AgentBehaviorConfig, reply: &Reply) {
        if reply.is_ok() {
            self.energy = self.energy.saturating_add(behavior.feed_gain);
        }
    }
}
