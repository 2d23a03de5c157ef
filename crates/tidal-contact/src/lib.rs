//! Tidal Contact History
//!
//! Records who met whom in an opportunistic network and decides when that
//! history is dense enough to drive statistical relay selection.
//!
//! # Components
//!
//! - [`ContactLedger`]: an append-only N×N matrix of encounter counts plus
//!   per-node totals. Grows lazily to the largest address seen.
//! - [`ReadinessGate`]: a one-way latch that opens once fewer than
//!   `zero_threshold · N²` ledger cells are still zero.
//! - [`SimContext`]: the single shared object holding both, owned by the
//!   simulation driver and handed to every per-node engine.
//!
//! # Sharing
//!
//! A discrete-event host advances one node at a time, but nothing here relies
//! on that: the ledger sits behind a `RwLock` and the gate's full-matrix scan
//! runs under the read lock, so it always sees a consistent snapshot.

mod context;
mod gate;
mod ledger;

pub use context::SimContext;
pub use gate::{max_zero_cells, opens_at, ReadinessGate, DEFAULT_ZERO_THRESHOLD};
pub use ledger::{ContactLedger, ContactPolicy, NodeAddr};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_gate_follows_ledger() {
        let ctx = SimContext::new(ContactPolicy::Symmetric);
        ctx.observe_network_size(2);

        ctx.record_contact(NodeAddr(0), NodeAddr(1));
        // Diagonal cells are still zero: 2 of 4, and 2 < 4 * 0.25 fails
        assert!(!ctx.check_start(DEFAULT_ZERO_THRESHOLD));

        // A looser threshold accepts two zero cells
        assert!(ctx.check_start(0.75));
        assert!(ctx.is_started());
    }
}
