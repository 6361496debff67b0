use std::{
    collections::HashMap,
    hash::Hash,
};

/// Opaque identifier for one invocation of an async operation. Threaded through
/// the whole operation and compared before any side effect is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// Sentinel stored by `cancel`: no minted token ever carries this value, so every
/// in-flight request on the slot is permanently orphaned.
const CANCELLED: u64 = 0;

/// Per-slot generation counters with last-writer-wins semantics.
///
/// Each slot key tracks at most one authoritative token. `start` supersedes any
/// in-flight request on the same slot; completions must pass their token back
/// through `is_current`/`finish`, and anything stale is silently dropped by the
/// caller. One instance is shared by the creation/feedback/improvement flows and
/// another tracks the single audio session.
pub struct RequestSlots<K> {
    active: HashMap<K, u64>,
    counter: u64,
}

impl<K: Eq + Hash> RequestSlots<K> {
    pub fn new() -> Self {
        Self { active: HashMap::new(), counter: CANCELLED }
    }

    /// Mint a fresh token and make it the slot's authoritative one, invalidating
    /// any request still in flight on this slot.
    pub fn start(&mut self, key: K) -> RequestToken {
        self.counter += 1;
        self.active.insert(key, self.counter);
        RequestToken(self.counter)
    }

    pub fn is_current(&self, key: &K, token: RequestToken) -> bool {
        self.active.get(key) == Some(&token.0)
    }

    /// Completion-clear: releases the slot only when the finishing operation is
    /// still the authoritative one. A newer request keeps its claim.
    pub fn finish(&mut self, key: &K, token: RequestToken) -> bool {
        if self.is_current(key, token) {
            self.active.remove(key);
            true
        } else {
            false
        }
    }

    /// Explicit cancellation: every token issued before this call is dead for
    /// good. A later `start` re-arms the slot.
    pub fn cancel(&mut self, key: K) {
        self.active.insert(key, CANCELLED);
    }

    /// Whether a request is live on this slot (drives busy indicators).
    pub fn is_active(&self, key: &K) -> bool {
        matches!(self.active.get(key), Some(&token) if token != CANCELLED)
    }
}

impl<K: Eq + Hash> Default for RequestSlots<K> {
    fn default() -> Self {
        Self::new()
    }
}
