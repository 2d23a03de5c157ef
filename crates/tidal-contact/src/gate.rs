//! Readiness gate for statistical forwarding.
//!
//! Scoring relays from contact history is meaningless while the history is
//! mostly empty. The gate stays closed until enough of the N×N ledger has
//! been filled:
//!
//! - N is fixed the first time a neighbor reports its known-node count
//! - the gate opens once `zero cells < N² × zero_threshold`
//! - once open it never closes
//!
//! With the default threshold of 0.25 the gate opens when at least 75% of
//! the pairwise cells are non-zero.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::{info, warn};

use crate::ContactLedger;

/// Default fraction of ledger cells allowed to remain zero.
pub const DEFAULT_ZERO_THRESHOLD: f64 = 0.25;

/// Largest zero-cell count (exclusive) at which an `n`-node ledger is ready.
///
/// # Examples
///
/// ```
/// use tidal_contact::max_zero_cells;
///
/// assert_eq!(max_zero_cells(4, 0.25), 4.0);
/// assert_eq!(max_zero_cells(10, 0.25), 25.0);
/// ```
pub fn max_zero_cells(network_size: usize, zero_threshold: f64) -> f64 {
    let n = network_size as f64;
    n * n * zero_threshold
}

/// Check whether `zero_cells` is sparse enough for an `n`-node ledger.
pub fn opens_at(zero_cells: usize, network_size: usize, zero_threshold: f64) -> bool {
    (zero_cells as f64) < max_zero_cells(network_size, zero_threshold)
}

/// One-way latch over the contact ledger.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    network_size: OnceLock<usize>,
    started: AtomicBool,
}

impl ReadinessGate {
    /// Create a closed gate with no network size yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a closed gate with the network size already fixed.
    pub fn with_network_size(network_size: usize) -> Self {
        let gate = Self::new();
        gate.observe_network_size(network_size);
        gate
    }

    /// Fix N on first observation. Later observations are ignored.
    ///
    /// Returns the N in force.
    pub fn observe_network_size(&self, network_size: usize) -> usize {
        *self.network_size.get_or_init(|| network_size)
    }

    /// N, once observed.
    pub fn network_size(&self) -> Option<usize> {
        self.network_size.get().copied()
    }

    /// Whether statistical forwarding may run.
    pub fn is_open(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Scan the ledger and open the gate if it is dense enough.
    ///
    /// Returns whether the gate is open afterwards. A gate without a known N
    /// stays closed.
    pub fn check_start(&self, ledger: &ContactLedger, zero_threshold: f64) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(n) = self.network_size() else {
            return false;
        };
        if n.checked_mul(n).is_none() {
            warn!(network_size = n, "Reported network size cannot be tracked, gate stays closed");
            return false;
        }

        let zeros = ledger.zero_cells(n);
        if opens_at(zeros, n, zero_threshold) {
            // Only the first opener logs
            if !self.started.swap(true, Ordering::AcqRel) {
                info!(
                    network_size = n,
                    zero_cells = zeros,
                    zero_threshold,
                    "Contact history dense enough, relay selection enabled"
                );
            }
            true
        } else {
            false
        }
    }
}
