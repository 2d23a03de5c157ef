//! Tidal Relay Engine
//!
//! Per-node relay decisions for delay-tolerant networks. Each node runs a
//! [`RelayEngine`] that the host simulation calls at four points:
//!
//! - [`RelayEngine::changed_connection`] when a link comes up or goes down
//! - [`RelayEngine::update`] once per transfer opportunity
//! - [`RelayEngine::create_new_message`] when the node originates a message
//! - [`RelayEngine::message_transferred`] / [`RelayEngine::transfer_done`]
//!   on either end of a finished handoff
//!
//! All engines of one run share a [`SimContext`] holding the contact ledger
//! and the readiness gate. Engines are built by an [`EngineFactory`] from a
//! validated [`RouterConfig`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tidal_router::{EngineFactory, RouterConfig};
//! use tidal_contact::NodeAddr;
//!
//! let factory = EngineFactory::new(RouterConfig::new(8)).unwrap();
//! let context = Arc::new(factory.new_context());
//! let engines: Vec<_> = (0..4)
//!     .map(|n| factory.build(NodeAddr(n), Arc::clone(&context)))
//!     .collect();
//! assert_eq!(engines[3].address(), NodeAddr(3));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod message;
pub mod replica;
pub mod tick;

pub use config::{QueueMode, RouterConfig, Scheme};
pub use engine::{EngineFactory, RelayEngine};
pub use error::{Error, Result};
pub use host::{ConnectionEvent, Handoff, NodeDirectory, RouterHost};
pub use message::{Message, MessageId, PropertyValue};
pub use replica::{ReplicaPolicy, COPIES_PROPERTY};
pub use tick::TickOutcome;

pub use tidal_contact::{ContactPolicy, NodeAddr, SimContext};
pub use tidal_scoring::Location;
