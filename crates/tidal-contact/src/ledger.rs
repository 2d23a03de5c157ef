//! Pairwise encounter counts.
//!
//! The ledger is a square matrix `count[a][b]` with a cached row sum
//! `total[a]`. Rows and columns are indexed by node address and the matrix
//! grows to cover the largest address recorded so far. Nothing is ever
//! decremented or removed.

use serde::{Deserialize, Serialize};

/// Address of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeAddr(pub u32);

impl NodeAddr {
    /// Row/column index of this node in the ledger.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// How a single contact updates the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPolicy {
    /// A contact between `a` and `b` counts in both directions.
    #[default]
    Symmetric,
    /// Only `count[a][b]` moves; the reverse cell is left to `b`'s own report.
    Directed,
}

/// Append-only encounter matrix.
#[derive(Debug, Clone, Default)]
pub struct ContactLedger {
    /// Square: `counts.len() == counts[i].len()` for every row.
    counts: Vec<Vec<u64>>,
    totals: Vec<u64>,
    policy: ContactPolicy,
}

impl ContactLedger {
    /// Create an empty ledger that grows on demand.
    pub fn new(policy: ContactPolicy) -> Self {
        Self {
            counts: Vec::new(),
            totals: Vec::new(),
            policy,
        }
    }

    /// Create a ledger pre-sized for `nodes` addresses.
    pub fn with_capacity(nodes: usize, policy: ContactPolicy) -> Self {
        let mut ledger = Self::new(policy);
        ledger.grow_to(nodes);
        ledger
    }

    /// The contact policy in force.
    pub fn policy(&self) -> ContactPolicy {
        self.policy
    }

    /// Current side length of the matrix.
    pub fn dimension(&self) -> usize {
        self.counts.len()
    }

    /// Record one contact between `a` and `b`.
    ///
    /// A self contact touches the single diagonal cell once under either
    /// policy.
    pub fn record_contact(&mut self, a: NodeAddr, b: NodeAddr) {
        self.grow_to(a.index().max(b.index()) + 1);

        self.bump(a, b);
        if self.policy == ContactPolicy::Symmetric && a != b {
            self.bump(b, a);
        }
    }

    /// Encounters of `a` with `b` (0 if never seen).
    pub fn encounter(&self, a: NodeAddr, b: NodeAddr) -> u64 {
        self.counts
            .get(a.index())
            .and_then(|row| row.get(b.index()))
            .copied()
            .unwrap_or(0)
    }

    /// Total encounters of `a` (0 if never seen).
    pub fn total(&self, a: NodeAddr) -> u64 {
        self.totals.get(a.index()).copied().unwrap_or(0)
    }

    /// Number of zero cells in the leading `n × n` block.
    ///
    /// Cells outside the grown matrix have never been written and count as
    /// zero.
    pub fn zero_cells(&self, n: usize) -> usize {
        let covered = n.min(self.dimension());
        let zeros_inside: usize = self.counts[..covered]
            .iter()
            .map(|row| row[..covered].iter().filter(|&&c| c == 0).count())
            .sum();
        let outside = n.saturating_mul(n).saturating_sub(covered * covered);
        zeros_inside.saturating_add(outside)
    }

    fn bump(&mut self, a: NodeAddr, b: NodeAddr) {
        if let Some(cell) = self
            .counts
            .get_mut(a.index())
            .and_then(|row| row.get_mut(b.index()))
        {
            *cell += 1;
            if let Some(total) = self.totals.get_mut(a.index()) {
                *total += 1;
            }
        }
    }

    fn grow_to(&mut self, dimension: usize) {
        if dimension <= self.dimension() {
            return;
        }
        for row in &mut self.counts {
            row.resize(dimension, 0);
        }
        self.counts.resize_with(dimension, || vec![0; dimension]);
        self.totals.resize(dimension, 0);
    }
}
