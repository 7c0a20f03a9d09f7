//! Reproduction rendezvous wait sets.
//!
//! A reproduction request parks its sender in a per-kind wait set. The
//! moment a set holds two entries the two lowest identifiers are popped
//! as parents and a birth is triggered, so between dispatches a set never
//! holds more than one waiter.

use std::collections::BTreeSet;

use veldt_types::{AgentKind, WorkerId};

/// Per-kind wait sets pairing up reproduction requesters.
#[derive(Debug, Default)]
pub struct ReproductionMatcher {
    preys: BTreeSet<WorkerId>,
    predators: BTreeSet<WorkerId>,
}

impl ReproductionMatcher {
    /// Create empty wait sets.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preys: BTreeSet::new(),
            predators: BTreeSet::new(),
        }
    }

    /// Park a worker in its kind's wait set.
    ///
    /// Returns `false` if it was already waiting.
    pub fn insert(&mut self, kind: AgentKind, id: WorkerId) -> bool {
        self.set_mut(kind).insert(id)
    }

    /// Remove a worker from whichever wait set holds it.
    ///
    /// Called when a worker dies or is eaten so that it can never be
    /// matched posthumously.
    pub fn remove(&mut self, id: WorkerId) -> bool {
        let from_preys = self.preys.remove(&id);
        let from_predators = self.predators.remove(&id);
        from_preys || from_predators
    }

    /// Pop the two lowest-identifier waiters of a kind as parents.
    ///
    /// Returns `None` while fewer than two workers are waiting.
    pub fn pop_pair(&mut self, kind: AgentKind) -> Option<(WorkerId, WorkerId)> {
        let set = self.set_mut(kind);
        if set.len() < 2 {
            return None;
        }
        let first = set.pop_first()?;
        let second = set.pop_first()?;
        Some((first, second))
    }

    /// Number of workers currently waiting for a partner of this kind.
    #[must_use]
    pub fn waiting(&self, kind: AgentKind) -> usize {
        match kind {
            AgentKind::Prey => self.preys.len(),
            AgentKind::Predator => self.predators.len(),
        }
    }

    fn set_mut(&mut self, kind: AgentKind) -> &mut BTreeSet<WorkerId> {
        match kind {
            AgentKind::Prey => &mut self.preys,
            AgentKind::Predator => &mut self.predators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> WorkerId {
        WorkerId::from_raw(raw)
    }

    #[test]
    fn a_lone_waiter_stays_parked() {
        let mut matcher = ReproductionMatcher::new();
        assert!(matcher.insert(AgentKind::Prey, id(5)));
        assert_eq!(matcher.pop_pair(AgentKind::Prey), None);
        assert_eq!(matcher.waiting(AgentKind::Prey), 1);
    }

    #[test]
    fn a_second_waiter_completes_the_pair() {
        let mut matcher = ReproductionMatcher::new();
        matcher.insert(AgentKind::Prey, id(9));
        matcher.insert(AgentKind::Prey, id(4));
        assert_eq!(matcher.pop_pair(AgentKind::Prey), Some((id(4), id(9))));
        assert_eq!(matcher.waiting(AgentKind::Prey), 0);
    }

    #[test]
    fn kinds_never_cross_match() {
        let mut matcher = ReproductionMatcher::new();
        matcher.insert(AgentKind::Prey, id(1));
        matcher.insert(AgentKind::Predator, id(2));
        assert_eq!(matcher.pop_pair(AgentKind::Prey), None);
        assert_eq!(matcher.pop_pair(AgentKind::Predator), None);
    }

    #[test]
    fn removal_covers_both_sets() {
        let mut matcher = ReproductionMatcher::new();
        matcher.insert(AgentKind::Predator, id(3));
        assert!(matcher.remove(id(3)));
        assert!(!matcher.remove(id(3)));
        assert_eq!(matcher.waiting(AgentKind::Predator), 0);
    }

    #[test]
    fn double_insertion_is_ignored() {
        let mut matcher = ReproductionMatcher::new();
        assert!(matcher.insert(AgentKind::Prey, id(5)));
        assert!(!matcher.insert(AgentKind::Prey, id(5)));
        assert_eq!(matcher.waiting(AgentKind::Prey), 1);
    }
}
