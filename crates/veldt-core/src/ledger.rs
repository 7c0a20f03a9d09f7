//! Tick counter and grass stock.
//!
//! The ledger is the environment's only shared resource pool. It is owned
//! by the orchestrator and mutated exclusively from its tick loop and the
//! command dispatch running on it, so it needs no interior locking.

/// Tick counter, grass stock, and the drought flag.
///
/// Grass grows by a fixed amount per tick unless drought is active, and
/// is consumed in fixed units by grazing prey. All arithmetic saturates:
/// the stock can neither overflow nor go below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLedger {
    tick: u64,
    grass: u64,
    drought: bool,
}

impl ResourceLedger {
    /// Create a ledger with the given starting grass stock.
    #[must_use]
    pub const fn new(initial_grass: u64, drought: bool) -> Self {
        Self {
            tick: 0,
            grass: initial_grass,
            drought,
        }
    }

    /// Completed ticks since startup.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Grass currently available.
    #[must_use]
    pub const fn grass(&self) -> u64 {
        self.grass
    }

    /// Whether grass growth is suspended.
    #[must_use]
    pub const fn drought(&self) -> bool {
        self.drought
    }

    /// Advance time by one tick, growing grass unless drought is active.
    pub const fn advance(&mut self, growth: u64) {
        self.tick = self.tick.saturating_add(1);
        if !self.drought {
            self.grass = self.grass.saturating_add(growth);
        }
    }

    /// Take one feeding's worth of grass from the stock.
    ///
    /// Returns `false` without mutating anything when less than `unit`
    /// grass remains.
    pub const fn consume_grass(&mut self, unit: u64) -> bool {
        if self.grass >= unit {
            self.grass = self.grass.saturating_sub(unit);
            true
        } else {
            false
        }
    }
}
