//! Run counters.

use serde::Serialize;

/// Counters accumulated over one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Messages originated
    pub created: u64,
    /// Transfers started (relays and deliveries)
    pub started: u64,
    /// Transfers completed (relays and deliveries)
    pub relayed: u64,
    /// Distinct messages that reached their destination
    pub delivered: u64,
    /// Transfers cut off by a link going down
    pub aborted: u64,
    /// Copies removed after their TTL ran out
    pub expired: u64,
    /// Copies evicted to make buffer room
    pub dropped: u64,
    /// Sum of creation-to-delivery times
    pub latency_total: u64,
    /// Step at which the readiness gate opened
    pub gate_opened_at: Option<u64>,
}

impl SimStats {
    /// Delivered over created, 0 before anything was created.
    pub fn delivery_ratio(&self) -> f64 {
        if self.created == 0 {
            0.0
        } else {
            self.delivered as f64 / self.created as f64
        }
    }

    /// Extra transfers per delivered message.
    pub fn overhead_ratio(&self) -> Option<f64> {
        (self.delivered > 0)
            .then(|| (self.relayed.saturating_sub(self.delivered)) as f64 / self.delivered as f64)
    }

    /// Mean creation-to-delivery time.
    pub fn mean_latency(&self) -> Option<f64> {
        (self.delivered > 0).then(|| self.latency_total as f64 / self.delivered as f64)
    }
}
