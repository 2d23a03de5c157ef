//! Simulation scenario.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tidal_router::RouterConfig;

use crate::error::{Error, Result};

/// Configuration for one simulation run.
///
/// Fields missing from a scenario file take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for deterministic mobility and traffic
    pub seed: u64,
    /// Number of nodes
    pub nodes: usize,
    /// Side of the square world
    pub area: f64,
    /// Links are up between nodes at most this far apart
    pub radio_range: f64,
    /// Largest per-axis move of a node in one step
    pub max_step: f64,
    /// Steps to run
    pub steps: u64,
    /// A new message is created every this many steps
    pub message_interval: u64,
    /// Size of created messages in bytes
    pub message_size: u64,
    /// Buffer capacity of every node in bytes
    pub buffer_capacity: u64,
    /// Deliveries older than this many steps stop counting as recent
    pub success_window: u64,
    /// Relay engine configuration shared by every node
    pub router: RouterConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            nodes: 20,
            area: 1000.0,
            radio_range: 100.0,
            max_step: 25.0,
            steps: 2000,
            message_interval: 10,
            message_size: 1_000,
            buffer_capacity: 50_000,
            success_window: 200,
            router: RouterConfig::new(6),
        }
    }
}

impl SimulationConfig {
    /// Load a scenario from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse a scenario from JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the world side and radio range together.
    #[must_use]
    pub fn with_geometry(mut self, area: f64, radio_range: f64) -> Self {
        self.area = area;
        self.radio_range = radio_range;
        self
    }

    #[must_use]
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn with_message_interval(mut self, interval: u64) -> Self {
        self.message_interval = interval;
        self
    }

    #[must_use]
    pub fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }

    /// Check the world parameters and the router config.
    pub fn validate(&self) -> Result<()> {
        if self.nodes < 2 {
            return Err(Error::InvalidConfig(format!(
                "need at least 2 nodes, got {}",
                self.nodes
            )));
        }
        if u32::try_from(self.nodes).is_err() {
            return Err(Error::InvalidConfig(format!("{} nodes is too many", self.nodes)));
        }
        if !(self.area > 0.0) || !(self.radio_range > 0.0) || !(self.max_step >= 0.0) {
            return Err(Error::InvalidConfig(
                "area and radio_range must be positive, max_step non-negative".into(),
            ));
        }
        if self.message_interval == 0 {
            return Err(Error::InvalidConfig("message_interval must be at least 1".into()));
        }
        self.router.validate()?;
        Ok(())
    }
}
