//! Per-node relay engines and the factory that builds them.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tidal_contact::{ContactPolicy, NodeAddr, SimContext};
use tidal_scoring::ClusterClassifier;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::host::{ConnectionEvent, RouterHost};
use crate::replica::{self, ReplicaPolicy};
use crate::{Message, MessageId, RouterConfig};

/// Builds engines that share one validated configuration.
#[derive(Debug, Clone)]
pub struct EngineFactory {
    config: Arc<RouterConfig>,
}

impl EngineFactory {
    /// Validate `config` and wrap it for sharing.
    pub fn new(config: RouterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The shared configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// A fresh context matching the configured contact policy.
    ///
    /// The driver owns the context and passes it to [`build`](Self::build)
    /// for every node of the same run.
    pub fn new_context(&self) -> SimContext {
        SimContext::new(self.config.contact_policy)
    }

    /// A fresh context pre-sized for `network_size` nodes.
    pub fn new_context_for(&self, network_size: usize) -> SimContext {
        SimContext::with_network_size(network_size, self.config.contact_policy)
    }

    /// Build the engine for one node.
    pub fn build(&self, address: NodeAddr, context: Arc<SimContext>) -> RelayEngine {
        if context.policy() != self.config.contact_policy {
            warn!(
                node = %address,
                configured = ?self.config.contact_policy,
                context = ?context.policy(),
                "Context contact policy differs from configuration, using the context's"
            );
        }

        let seed = self.config.queue_seed ^ u64::from(address.0).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        RelayEngine {
            address,
            replicas: ReplicaPolicy::new(self.config.initial_copies, self.config.binary_mode),
            classifier: ClusterClassifier::new(self.config.max_iterations),
            config: Arc::clone(&self.config),
            context,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// The relay decision engine of one node.
///
/// Holds only per-node state; contact history lives in the shared
/// [`SimContext`].
#[derive(Debug)]
pub struct RelayEngine {
    pub(crate) address: NodeAddr,
    pub(crate) config: Arc<RouterConfig>,
    pub(crate) context: Arc<SimContext>,
    pub(crate) replicas: ReplicaPolicy,
    pub(crate) classifier: ClusterClassifier,
    pub(crate) rng: StdRng,
}

impl RelayEngine {
    /// Address of the node this engine routes for.
    pub fn address(&self) -> NodeAddr {
        self.address
    }

    /// The shared contact context.
    pub fn context(&self) -> &Arc<SimContext> {
        &self.context
    }

    /// Replica rules in force.
    pub fn replicas(&self) -> ReplicaPolicy {
        self.replicas
    }

    /// A link to a neighbor changed state.
    ///
    /// On link-up: fixes the gate's N from the peer's report, records the
    /// contact and re-checks the gate. The host reports every link to both
    /// endpoints, so under [`ContactPolicy::Symmetric`] only the
    /// lower-addressed endpoint writes the (two-way) contact.
    pub fn changed_connection(&self, event: &ConnectionEvent) {
        if !event.is_up {
            return;
        }

        self.context.observe_network_size(event.known_nodes);

        let records = match self.context.policy() {
            ContactPolicy::Symmetric => self.address < event.peer,
            ContactPolicy::Directed => true,
        };
        if records {
            self.context.record_contact(self.address, event.peer);
        }

        if !self.context.is_started() {
            self.context.check_start(self.config.zero_threshold);
        }
    }

    /// Originate a message at this node.
    ///
    /// Reserves buffer space, stamps the configured TTL and the initial
    /// replica count, then stores the message.
    pub fn create_new_message<H>(&self, host: &mut H, mut message: Message)
    where
        H: RouterHost + ?Sized,
    {
        host.make_room_for(message.size);

        if let Some(ttl) = self.config.message_ttl {
            message.ttl = Some(ttl);
        }
        self.replicas.stamp(&mut message);

        debug!(
            node = %self.address,
            message = %message.id,
            to = %message.to,
            copies = self.replicas.initial_copies(),
            binary = self.replicas.is_binary(),
            "Created message"
        );
        host.add_message(message);
    }

    /// A message copy arrived at this node; set the receiver's share.
    ///
    /// Returns the copies this node now holds.
    pub fn message_transferred(&self, message: &mut Message) -> Result<u32> {
        let received = replica::copies(message)?;
        let share = self.replicas.receiver_share(received);
        replica::set_copies(message, share);

        trace!(node = %self.address, message = %message.id, received, share, "Received copies");
        Ok(share)
    }

    /// A handoff of `id` from this node finished; reduce what is left.
    ///
    /// Returns the residual copies, or `None` if the message was dropped
    /// from the buffer while the transfer ran.
    pub fn transfer_done<H>(&self, host: &mut H, id: &MessageId) -> Result<Option<u32>>
    where
        H: RouterHost + ?Sized,
    {
        let Some(message) = host.message_mut(id) else {
            return Ok(None);
        };

        let copies = replica::copies(message)?;
        let residual = self.replicas.sender_residual(copies);
        replica::set_copies(message, residual);

        trace!(node = %self.address, message = %id, copies, residual, "Sent copies");
        Ok(Some(residual))
    }
}
