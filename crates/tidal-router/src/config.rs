//! Relay engine configuration.

use serde::{Deserialize, Serialize};
use tidal_contact::{ContactPolicy, DEFAULT_ZERO_THRESHOLD};
use tidal_scoring::DEFAULT_MAX_ITERATIONS;

use crate::error::{Error, Result};

/// Which scorer picks relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Single best relay by `alpha / beta`, every message in scope.
    Ratio,
    /// Every relay in the positive cluster, messages with copies left only.
    #[default]
    Cluster,
}

/// Order in which held messages are considered each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Oldest arrival first.
    #[default]
    Fifo,
    /// Seeded shuffle, reproducible per node.
    Random,
}

fn default_zero_threshold() -> f64 {
    DEFAULT_ZERO_THRESHOLD
}

fn default_binary_mode() -> bool {
    true
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// Static configuration shared by every node's engine.
///
/// `initial_copies` has no default and must be given explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Replica count stamped on newly created messages.
    pub initial_copies: u32,

    /// Binary spray-and-wait (halve on handoff) instead of one-at-a-time.
    #[serde(default = "default_binary_mode")]
    pub binary_mode: bool,

    /// Fraction of ledger cells allowed to stay zero before relaying starts.
    #[serde(default = "default_zero_threshold")]
    pub zero_threshold: f64,

    /// Relay scorer.
    #[serde(default)]
    pub scheme: Scheme,

    /// How link-up events update the contact ledger.
    #[serde(default)]
    pub contact_policy: ContactPolicy,

    /// Bound on Lloyd iterations for the cluster scheme.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// TTL stamped on newly created messages, in simulation time units.
    #[serde(default)]
    pub message_ttl: Option<u64>,

    /// Order in which held messages are scored.
    #[serde(default)]
    pub queue_mode: QueueMode,

    /// Seed for [`QueueMode::Random`]; mixed with the node address.
    #[serde(default)]
    pub queue_seed: u64,
}

impl RouterConfig {
    /// Create a config with the given replica budget and defaults elsewhere.
    #[must_use]
    pub fn new(initial_copies: u32) -> Self {
        Self {
            initial_copies,
            binary_mode: default_binary_mode(),
            zero_threshold: DEFAULT_ZERO_THRESHOLD,
            scheme: Scheme::default(),
            contact_policy: ContactPolicy::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            message_ttl: None,
            queue_mode: QueueMode::default(),
            queue_seed: 0,
        }
    }

    /// Set binary or standard spray-and-wait.
    #[must_use]
    pub fn with_binary_mode(mut self, binary_mode: bool) -> Self {
        self.binary_mode = binary_mode;
        self
    }

    /// Set the readiness gate's zero threshold.
    #[must_use]
    pub fn with_zero_threshold(mut self, zero_threshold: f64) -> Self {
        self.zero_threshold = zero_threshold;
        self
    }

    /// Set the relay scorer.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the contact policy.
    #[must_use]
    pub fn with_contact_policy(mut self, policy: ContactPolicy) -> Self {
        self.contact_policy = policy;
        self
    }

    /// Set the Lloyd iteration bound.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Stamp a TTL on created messages.
    #[must_use]
    pub fn with_message_ttl(mut self, ttl: u64) -> Self {
        self.message_ttl = Some(ttl);
        self
    }

    /// Set the message queue order.
    #[must_use]
    pub fn with_queue_mode(mut self, mode: QueueMode, seed: u64) -> Self {
        self.queue_mode = mode;
        self.queue_seed = seed;
        self
    }

    /// Check every setting is inside its domain.
    pub fn validate(&self) -> Result<()> {
        if self.initial_copies < 1 {
            return Err(Error::config("initial_copies", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.zero_threshold) {
            return Err(Error::config(
                "zero_threshold",
                format!("{} is outside [0, 1]", self.zero_threshold),
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations", "must be at least 1"));
        }
        if self.message_ttl == Some(0) {
            return Err(Error::config("message_ttl", "must be positive when set"));
        }
        Ok(())
    }
}
