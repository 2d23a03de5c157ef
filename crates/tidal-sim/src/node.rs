//! Node state and the router-facing views onto it.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tidal_contact::NodeAddr;
use tidal_router::{Handoff, Message, MessageId, NodeDirectory, RouterHost};
use tidal_scoring::Location;
use tracing::trace;

use crate::stats::SimStats;

/// An undirected link, stored with the lower address first.
pub type Link = (NodeAddr, NodeAddr);

/// Normalise a pair into a [`Link`].
pub fn link(a: NodeAddr, b: NodeAddr) -> Link {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One node of the world.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub addr: NodeAddr,
    pub location: Location,
    pub capacity: u64,
    pub buffer: Vec<Message>,
    /// Messages this node consumed as their destination
    pub delivered: HashSet<MessageId>,
    /// Steps at which this node completed a delivery
    pub successes: VecDeque<u64>,
}

impl NodeState {
    pub fn new(addr: NodeAddr, location: Location, capacity: u64) -> Self {
        Self {
            addr,
            location,
            capacity,
            buffer: Vec::new(),
            delivered: HashSet::new(),
            successes: VecDeque::new(),
        }
    }

    /// Bytes in use.
    pub fn used(&self) -> u64 {
        self.buffer.iter().map(|m| m.size).sum()
    }

    pub fn holds(&self, id: &MessageId) -> bool {
        self.buffer.iter().any(|m| &m.id == id)
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.buffer.iter().find(|m| &m.id == id)
    }

    /// Forget successes older than `window` steps.
    pub fn prune_successes(&mut self, now: u64, window: u64) {
        while self
            .successes
            .front()
            .is_some_and(|&at| now.saturating_sub(at) > window)
        {
            self.successes.pop_front();
        }
    }
}

/// A transfer in flight; completes at `completes_at`.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub from: NodeAddr,
    pub to: NodeAddr,
    /// The sender's copy as it was when the transfer started
    pub message: Message,
    pub completes_at: u64,
}

impl Transfer {
    pub fn involves(&self, node: NodeAddr) -> bool {
        self.from == node || self.to == node
    }

    pub fn link(&self) -> Link {
        link(self.from, self.to)
    }
}

/// One node's window onto the world, handed to its engine.
pub struct NodeView<'w> {
    pub addr: NodeAddr,
    pub nodes: &'w mut [NodeState],
    pub links: &'w BTreeSet<Link>,
    pub transfers: &'w mut Vec<Transfer>,
    pub stats: &'w mut SimStats,
    pub now: u64,
}

impl NodeView<'_> {
    fn me(&self) -> &NodeState {
        &self.nodes[self.addr.index()]
    }

    fn me_mut(&mut self) -> &mut NodeState {
        &mut self.nodes[self.addr.index()]
    }

    fn busy(&self, node: NodeAddr) -> bool {
        self.transfers.iter().any(|t| t.involves(node))
    }

    fn consumed_or_held(&self, peer: NodeAddr, id: &MessageId) -> bool {
        let peer = &self.nodes[peer.index()];
        peer.holds(id) || peer.delivered.contains(id)
    }

    /// Start sending `id` to `peer` if both ends are free and the link is up.
    fn start(&mut self, id: &MessageId, peer: NodeAddr) -> bool {
        if peer == self.addr
            || !self.links.contains(&link(self.addr, peer))
            || self.busy(self.addr)
            || self.busy(peer)
            || self.consumed_or_held(peer, id)
        {
            return false;
        }
        let Some(message) = self.me().message(id).cloned() else {
            return false;
        };

        trace!(from = %self.addr, to = %peer, message = %id, "Transfer started");
        self.transfers.push(Transfer {
            from: self.addr,
            to: peer,
            message,
            completes_at: self.now + 1,
        });
        self.stats.started += 1;
        true
    }
}

impl RouterHost for NodeView<'_> {
    fn address(&self) -> NodeAddr {
        self.addr
    }

    fn can_start_transfer(&self) -> bool {
        !self.me().buffer.is_empty() && self.links.iter().any(|&(a, b)| a == self.addr || b == self.addr)
    }

    fn is_transferring(&self) -> bool {
        self.busy(self.addr)
    }

    fn exchange_deliverable_messages(&mut self) -> Option<Handoff> {
        let deliverable: Vec<Handoff> = self
            .me()
            .buffer
            .iter()
            .map(|m| Handoff::new(m.id.clone(), m.to))
            .collect();
        deliverable.into_iter().find(|h| self.start(&h.message, h.peer))
    }

    fn try_messages_for_connected(&mut self, candidates: &[Handoff]) -> Option<Handoff> {
        candidates
            .iter()
            .find(|h| self.start(&h.message, h.peer))
            .cloned()
    }

    fn connections(&self) -> Vec<NodeAddr> {
        let mut peers: Vec<NodeAddr> = self
            .links
            .iter()
            .filter_map(|&(a, b)| match (a == self.addr, b == self.addr) {
                (true, false) => Some(b),
                (false, true) => Some(a),
                _ => None,
            })
            .collect();
        peers.sort();
        peers
    }

    fn messages(&self) -> Vec<&Message> {
        self.me().buffer.iter().collect()
    }

    fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.me_mut().buffer.iter_mut().find(|m| &m.id == id)
    }

    fn peer_is_transferring(&self, peer: NodeAddr) -> bool {
        self.busy(peer)
    }

    fn peer_has_message(&self, peer: NodeAddr, id: &MessageId) -> bool {
        self.consumed_or_held(peer, id)
    }

    /// Evict the oldest copies not being sent until `size` more bytes fit.
    fn make_room_for(&mut self, size: u64) {
        let addr = self.addr;
        let sending: HashSet<MessageId> = self
            .transfers
            .iter()
            .filter(|t| t.from == addr)
            .map(|t| t.message.id.clone())
            .collect();

        while self.me().used() + size > self.me().capacity {
            let victim = self
                .me()
                .buffer
                .iter()
                .enumerate()
                .filter(|(_, m)| !sending.contains(&m.id))
                .min_by_key(|(_, m)| (m.received_at, m.id.clone()))
                .map(|(index, _)| index);

            let Some(index) = victim else {
                break;
            };
            let evicted = self.me_mut().buffer.remove(index);
            trace!(node = %addr, message = %evicted.id, "Evicted for room");
            self.stats.dropped += 1;
        }
    }

    fn add_message(&mut self, message: Message) {
        self.me_mut().buffer.push(message);
    }
}

/// Read-only per-step snapshot of node attributes.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    locations: Vec<Location>,
    occupancy: Vec<f64>,
    successes: Vec<u32>,
}

impl Snapshot {
    pub fn capture(nodes: &[NodeState]) -> Self {
        Self {
            locations: nodes.iter().map(|n| n.location).collect(),
            occupancy: nodes
                .iter()
                .map(|n| (n.used() as f64 / n.capacity.max(1) as f64).min(1.0))
                .collect(),
            successes: nodes
                .iter()
                .map(|n| u32::try_from(n.successes.len()).unwrap_or(u32::MAX))
                .collect(),
        }
    }
}

impl NodeDirectory for Snapshot {
    fn location(&self, node: NodeAddr) -> Location {
        self.locations.get(node.index()).copied().unwrap_or_default()
    }

    fn buffer_occupancy(&self, node: NodeAddr) -> f64 {
        self.occupancy.get(node.index()).copied().unwrap_or(0.0)
    }

    fn recent_successes(&self, node: NodeAddr) -> u32 {
        self.successes.get(node.index()).copied().unwrap_or(0)
    }

    fn known_nodes(&self) -> Vec<NodeAddr> {
        (0..self.locations.len() as u32).map(NodeAddr).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: NodeAddr = NodeAddr(0);
    const B: NodeAddr = NodeAddr(1);
    const C: NodeAddr = NodeAddr(2);

    struct World {
        nodes: Vec<NodeState>,
        links: BTreeSet<Link>,
        transfers: Vec<Transfer>,
        stats: SimStats,
    }

    impl World {
        fn new() -> Self {
            let nodes = (0..3)
                .map(|n| NodeState::new(NodeAddr(n), Location::new(f64::from(n), 0.0), 3_000))
                .collect();
            Self {
                nodes,
                links: [link(B, A), link(A, C)].into_iter().collect(),
                transfers: Vec::new(),
                stats: SimStats::default(),
            }
        }

        fn view(&mut self, addr: NodeAddr) -> NodeView<'_> {
            NodeView {
                addr,
                nodes: &mut self.nodes,
                links: &self.links,
                transfers: &mut self.transfers,
                stats: &mut self.stats,
                now: 7,
            }
        }
    }

    fn msg(id: &str, to: NodeAddr, received_at: u64) -> Message {
        let mut m = Message::new(MessageId::new(id), A, to, 1_000, 0);
        m.received_at = received_at;
        m
    }

    #[test]
    fn connections_are_sorted_peers() {
        let mut world = World::new();
        assert_eq!(world.view(A).connections(), vec![B, C]);
        assert_eq!(world.view(B).connections(), vec![A]);
    }

    #[test]
    fn one_transfer_per_node() {
        let mut world = World::new();
        world.nodes[0].buffer = vec![msg("M1", C, 0), msg("M2", C, 0)];

        let mut view = world.view(A);
        let requests = [
            Handoff::new(MessageId::new("M1"), B),
            Handoff::new(MessageId::new("M2"), C),
        ];
        assert_eq!(view.try_messages_for_connected(&requests), Some(requests[0].clone()));
        assert!(view.is_transferring());
        assert!(view.peer_is_transferring(B));
        assert_eq!(view.try_messages_for_connected(&requests[1..]), None);

        assert_eq!(world.transfers.len(), 1);
        assert_eq!(world.transfers[0].completes_at, 8);
        assert_eq!(world.stats.started, 1);
    }

    #[test]
    fn no_transfer_without_link_or_to_holder() {
        let mut world = World::new();
        world.nodes[0].buffer = vec![msg("M1", C, 0)];
        world.nodes[1].delivered.insert(MessageId::new("M1"));

        let mut view = world.view(A);
        assert!(view.peer_has_message(B, &MessageId::new("M1")));
        assert_eq!(
            view.try_messages_for_connected(&[Handoff::new(MessageId::new("M1"), B)]),
            None
        );

        let mut view = world.view(B);
        assert_eq!(
            view.try_messages_for_connected(&[Handoff::new(MessageId::new("M1"), C)]),
            None
        );
    }

    #[test]
    fn direct_delivery_targets_connected_destination() {
        let mut world = World::new();
        world.nodes[0].buffer = vec![msg("far", NodeAddr(2), 0)];

        let started = world.view(A).exchange_deliverable_messages();
        assert_eq!(started, Some(Handoff::new(MessageId::new("far"), C)));
    }

    #[test]
    fn room_made_by_evicting_oldest_idle_copy() {
        let mut world = World::new();
        world.nodes[0].buffer = vec![msg("new", C, 5), msg("old", C, 1), msg("sending", C, 0)];
        world.transfers.push(Transfer {
            from: A,
            to: B,
            message: msg("sending", C, 0),
            completes_at: 8,
        });

        world.view(A).make_room_for(1_000);

        let left: Vec<_> = world.nodes[0].buffer.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(left, ["new", "sending"]);
        assert_eq!(world.stats.dropped, 1);
    }

    #[test]
    fn snapshot_reports_occupancy_and_successes() {
        let mut world = World::new();
        world.nodes[1].buffer = vec![msg("M1", C, 0)];
        world.nodes[2].successes.extend([3, 4]);

        let snapshot = Snapshot::capture(&world.nodes);
        assert_eq!(snapshot.known_nodes(), vec![A, B, C]);
        assert_eq!(snapshot.location(C), Location::new(2.0, 0.0));
        assert!((snapshot.buffer_occupancy(B) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(snapshot.recent_successes(C), 2);
    }

    #[test]
    fn old_successes_are_pruned() {
        let mut node = NodeState::new(A, Location::ORIGIN, 10);
        node.successes.extend([1, 50, 90]);
        node.prune_successes(100, 40);
        assert_eq!(node.successes, [90]);
    }
}
