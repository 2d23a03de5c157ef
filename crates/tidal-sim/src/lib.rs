//! Tidal Reference Simulator
//!
//! A small deterministic world for exercising Tidal relay engines: nodes
//! random-walk on a square, links come up inside radio range, transfers take
//! one step and every node runs its own [`RelayEngine`](tidal_router::RelayEngine)
//! over a shared contact context.
//!
//! ```
//! use tidal_sim::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::default().with_nodes(6).with_steps(50);
//! let mut sim = Simulation::new(config).unwrap();
//! let stats = sim.run().unwrap();
//! assert!(stats.created > 0);
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod stats;
pub mod world;

pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use node::{NodeState, Snapshot};
pub use stats::SimStats;
pub use world::Simulation;
