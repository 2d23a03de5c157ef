//! The shared simulation context.

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use tracing::trace;

use crate::{ContactLedger, ContactPolicy, NodeAddr, ReadinessGate};

/// Contact state shared by every node's engine in one simulation run.
///
/// Owned by the driver (usually behind an `Arc`) and injected into each
/// engine at construction. Ledger writes take the write lock; readers and
/// the gate scan take the read lock, so a gate decision is always made on a
/// consistent matrix.
#[derive(Debug)]
pub struct SimContext {
    ledger: RwLock<ContactLedger>,
    gate: ReadinessGate,
}

impl SimContext {
    /// Create a context with a lazily growing ledger.
    pub fn new(policy: ContactPolicy) -> Self {
        Self {
            ledger: RwLock::new(ContactLedger::new(policy)),
            gate: ReadinessGate::new(),
        }
    }

    /// Create a context pre-sized for a known network.
    ///
    /// Fixes the gate's N up front instead of waiting for the first
    /// neighbor report.
    pub fn with_network_size(network_size: usize, policy: ContactPolicy) -> Self {
        Self {
            ledger: RwLock::new(ContactLedger::with_capacity(network_size, policy)),
            gate: ReadinessGate::with_network_size(network_size),
        }
    }

    /// The ledger's contact policy.
    pub fn policy(&self) -> ContactPolicy {
        self.ledger().policy()
    }

    /// Record one contact between `a` and `b`.
    pub fn record_contact(&self, a: NodeAddr, b: NodeAddr) {
        // A poisoned lock still holds a valid matrix: writes are single increments
        let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
        ledger.record_contact(a, b);
        trace!(%a, %b, count = ledger.encounter(a, b), "Recorded contact");
    }

    /// Encounters of `a` with `b`.
    pub fn encounter(&self, a: NodeAddr, b: NodeAddr) -> u64 {
        self.ledger().encounter(a, b)
    }

    /// Total encounters of `a`.
    pub fn total(&self, a: NodeAddr) -> u64 {
        self.ledger().total(a)
    }

    /// Read access to the whole ledger for one scoring pass.
    ///
    /// Keep the guard for the duration of the pass and drop it before
    /// recording further contacts.
    pub fn ledger(&self) -> RwLockReadGuard<'_, ContactLedger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fix the gate's N on first observation.
    pub fn observe_network_size(&self, network_size: usize) -> usize {
        self.gate.observe_network_size(network_size)
    }

    /// Re-evaluate the gate against the current ledger.
    pub fn check_start(&self, zero_threshold: f64) -> bool {
        if self.gate.is_open() {
            return true;
        }
        let ledger = self.ledger();
        self.gate.check_start(&ledger, zero_threshold)
    }

    /// Whether the gate has opened.
    pub fn is_started(&self) -> bool {
        self.gate.is_open()
    }

    /// The gate itself.
    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn presized_context_knows_network() {
        let ctx = SimContext::with_network_size(5, ContactPolicy::Symmetric);
        assert_eq!(ctx.gate().network_size(), Some(5));
        assert_eq!(ctx.ledger().dimension(), 5);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let ctx = Arc::new(SimContext::new(ContactPolicy::Symmetric));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for _ in 0..250 {
                        ctx.record_contact(NodeAddr(1), NodeAddr(2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ctx.encounter(NodeAddr(1), NodeAddr(2)), 1000);
        assert_eq!(ctx.encounter(NodeAddr(2), NodeAddr(1)), 1000);
        assert_eq!(ctx.total(NodeAddr(2)), 1000);
    }
}
