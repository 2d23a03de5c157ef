//! Collaborator traits implemented by the host simulation.
//!
//! The engine never moves bits, stores messages or tracks links itself. It
//! asks the host through [`RouterHost`] (one node's router primitives) and
//! [`NodeDirectory`] (read-only attributes of every node).

use tidal_contact::NodeAddr;
use tidal_scoring::Location;

use crate::{Message, MessageId};

/// A request to hand `message` to `peer` over their connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handoff {
    pub message: MessageId,
    pub peer: NodeAddr,
}

impl Handoff {
    pub fn new(message: MessageId, peer: NodeAddr) -> Self {
        Self { message, peer }
    }
}

/// A link between the local node and `peer` came up or went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub peer: NodeAddr,
    pub is_up: bool,
    /// How many nodes the peer knows of (the network size it reports).
    pub known_nodes: usize,
}

impl ConnectionEvent {
    pub fn up(peer: NodeAddr, known_nodes: usize) -> Self {
        Self {
            peer,
            is_up: true,
            known_nodes,
        }
    }

    pub fn down(peer: NodeAddr, known_nodes: usize) -> Self {
        Self {
            peer,
            is_up: false,
            known_nodes,
        }
    }
}

/// Runtime attributes of nodes, owned by the host.
pub trait NodeDirectory {
    /// Current position of `node`.
    fn location(&self, node: NodeAddr) -> Location;

    /// Fraction of `node`'s buffer in use, in [0, 1].
    fn buffer_occupancy(&self, node: NodeAddr) -> f64;

    /// Recent delivery successes credited to `node`.
    fn recent_successes(&self, node: NodeAddr) -> u32;

    /// Every node in the network.
    fn known_nodes(&self) -> Vec<NodeAddr>;
}

/// One node's router primitives.
pub trait RouterHost {
    /// Address of the local node.
    fn address(&self) -> NodeAddr;

    /// Whether the local node could start a new transfer at all.
    fn can_start_transfer(&self) -> bool;

    /// Whether the local node is sending or receiving right now.
    fn is_transferring(&self) -> bool;

    /// Try to hand any held message to its final destination among the
    /// connected peers. Returns the transfer that started, if any.
    fn exchange_deliverable_messages(&mut self) -> Option<Handoff>;

    /// Try the candidates in order and start the first one that can go.
    ///
    /// The host enforces one active transfer per node, so at most one
    /// candidate starts; the rest are simply dropped for this tick.
    fn try_messages_for_connected(&mut self, candidates: &[Handoff]) -> Option<Handoff>;

    /// Currently connected peers, in the host's fixed enumeration order.
    fn connections(&self) -> Vec<NodeAddr>;

    /// Messages held by the local node.
    fn messages(&self) -> Vec<&Message>;

    /// Mutable access to a held message.
    fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message>;

    /// Whether `peer` is sending or receiving right now.
    fn peer_is_transferring(&self, peer: NodeAddr) -> bool;

    /// Whether `peer` already holds (or has consumed) message `id`.
    fn peer_has_message(&self, peer: NodeAddr, id: &MessageId) -> bool;

    /// Evict whatever the buffer policy dictates to fit `size` more bytes.
    fn make_room_for(&mut self, size: u64);

    /// Store a message in the local buffer.
    fn add_message(&mut self, message: Message);
}
