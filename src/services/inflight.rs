use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Handed out when a mutation on a target starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    key: K,
    seq: u64,
    epoch: u64,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Per-target in-flight guard with monotonically increasing request numbers.
///
/// At most one mutation per target runs at a time; a second one is refused
/// and the caller coalesces it. A response is applied only while its ticket
/// is still the latest for that target. `reset` (session teardown) makes
/// every outstanding ticket stale.
#[derive(Debug)]
pub struct InFlight<K> {
    active: HashSet<K>,
    latest: HashMap<K, u64>,
    epoch: u64,
}

impl<K> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            active: HashSet::new(),
            latest: HashMap::new(),
            epoch: 0,
        }
    }
}

impl<K: Hash + Eq + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.active.contains(key)
    }

    /// Starts a mutation on `key`, or returns `None` when one is already running
    pub fn try_begin(&mut self, key: K) -> Option<Ticket<K>> {
        if self.active.contains(&key) {
            return None;
        }
        let seq = self.latest.entry(key.clone()).or_insert(0);
        *seq += 1;
        let ticket = Ticket {
            key: key.clone(),
            seq: *seq,
            epoch: self.epoch,
        };
        self.active.insert(key);
        Some(ticket)
    }

    /// Whether a response for `ticket` may still be applied
    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        ticket.epoch == self.epoch && self.latest.get(&ticket.key) == Some(&ticket.seq)
    }

    pub fn finish(&mut self, ticket: &Ticket<K>) {
        if self.is_current(ticket) {
            self.active.remove(&ticket.key);
        }
    }

    pub fn reset(&mut self) {
        self.epoch += 1;
        self.active.clear();
        self.latest.clear();
    }
}
