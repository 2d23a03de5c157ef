//! The simulated world and its step loop.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tidal_contact::{NodeAddr, SimContext};
use tidal_router::{ConnectionEvent, EngineFactory, Message, MessageId, RelayEngine, RouterHost};
use tidal_scoring::Location;
use tracing::{debug, info, trace};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::node::{link, Link, NodeState, NodeView, Snapshot, Transfer};
use crate::stats::SimStats;

/// A deterministic random-walk world driving one relay engine per node.
///
/// Each [`step`](Self::step) moves every node, reports link changes (a link
/// going down aborts its transfer), completes due transfers, expires and
/// creates messages, then ticks every engine in address order.
pub struct Simulation {
    config: SimulationConfig,
    rng: StdRng,
    context: Arc<SimContext>,
    engines: Vec<RelayEngine>,
    nodes: Vec<NodeState>,
    links: BTreeSet<Link>,
    transfers: Vec<Transfer>,
    stats: SimStats,
    now: u64,
    next_message: u64,
}

impl Simulation {
    /// Create a world with randomly placed nodes.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let factory = EngineFactory::new(config.router.clone())?;
        let context = Arc::new(factory.new_context());
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut nodes = Vec::with_capacity(config.nodes);
        let mut engines = Vec::with_capacity(config.nodes);
        for n in 0..config.nodes as u32 {
            let addr = NodeAddr(n);
            let location = Location::new(rng.gen_range(0.0..=config.area), rng.gen_range(0.0..=config.area));
            nodes.push(NodeState::new(addr, location, config.buffer_capacity));
            engines.push(factory.build(addr, Arc::clone(&context)));
        }

        debug!(nodes = config.nodes, seed = config.seed, scheme = ?factory.config().scheme, "Simulation created");

        Ok(Self {
            config,
            rng,
            context,
            engines,
            nodes,
            links: BTreeSet::new(),
            transfers: Vec::new(),
            stats: SimStats::default(),
            now: 0,
            next_message: 0,
        })
    }

    /// Advance the world by one step.
    pub fn step(&mut self) -> Result<()> {
        self.now += 1;

        self.move_nodes();
        self.update_links();
        self.complete_transfers()?;
        self.expire();

        if self.now % self.config.message_interval == 0 {
            self.create_message();
        }

        let directory = Snapshot::capture(&self.nodes);
        for index in 0..self.engines.len() {
            let mut view = NodeView {
                addr: NodeAddr(index as u32),
                nodes: &mut self.nodes,
                links: &self.links,
                transfers: &mut self.transfers,
                stats: &mut self.stats,
                now: self.now,
            };
            let outcome = self.engines[index].update(&mut view, &directory);
            trace!(node = index, ?outcome, "Tick");
        }
        Ok(())
    }

    /// Run every configured step.
    pub fn run(&mut self) -> Result<&SimStats> {
        for _ in 0..self.config.steps {
            self.step()?;
        }
        info!(
            steps = self.now,
            created = self.stats.created,
            delivered = self.stats.delivered,
            ratio = self.stats.delivery_ratio(),
            "Simulation finished"
        );
        Ok(&self.stats)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Current step.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The shared contact context.
    pub fn context(&self) -> &Arc<SimContext> {
        &self.context
    }

    pub fn location(&self, node: NodeAddr) -> Option<Location> {
        self.nodes.get(node.index()).map(|n| n.location)
    }

    /// Messages held by `node`.
    pub fn buffer(&self, node: NodeAddr) -> &[Message] {
        self.nodes.get(node.index()).map_or(&[], |n| n.buffer.as_slice())
    }

    /// Links currently up.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.links.iter().copied()
    }

    /// Transfers currently in flight.
    pub fn transfers_in_flight(&self) -> usize {
        self.transfers.len()
    }

    /// Originate a message from `from` to `to` now.
    pub fn inject(&mut self, from: NodeAddr, to: NodeAddr) -> MessageId {
        let id = MessageId::new(format!("M{}", self.next_message));
        self.next_message += 1;

        let message = Message::new(id.clone(), from, to, self.config.message_size, self.now);
        let mut view = NodeView {
            addr: from,
            nodes: &mut self.nodes,
            links: &self.links,
            transfers: &mut self.transfers,
            stats: &mut self.stats,
            now: self.now,
        };
        self.engines[from.index()].create_new_message(&mut view, message);
        self.stats.created += 1;
        id
    }

    fn create_message(&mut self) {
        let n = self.nodes.len() as u32;
        let from = self.rng.gen_range(0..n);
        let mut to = self.rng.gen_range(0..n - 1);
        if to >= from {
            to += 1;
        }
        self.inject(NodeAddr(from), NodeAddr(to));
    }

    fn complete_transfers(&mut self) -> Result<()> {
        let now = self.now;
        let (due, pending): (Vec<Transfer>, Vec<Transfer>) = std::mem::take(&mut self.transfers)
            .into_iter()
            .partition(|t| t.completes_at <= now);
        self.transfers = pending;

        for transfer in due {
            self.stats.relayed += 1;
            if transfer.to == transfer.message.to {
                self.deliver(transfer);
            } else {
                self.relay(transfer)?;
            }
        }
        Ok(())
    }

    fn deliver(&mut self, transfer: Transfer) {
        let id = transfer.message.id.clone();
        let receiver = &mut self.nodes[transfer.to.index()];
        if receiver.delivered.insert(id.clone()) {
            self.stats.delivered += 1;
            self.stats.latency_total += self.now.saturating_sub(transfer.message.created_at);
            debug!(message = %id, by = %transfer.from, at = self.now, "Delivered");
        }

        let sender = &mut self.nodes[transfer.from.index()];
        sender.buffer.retain(|m| m.id != id);
        sender.successes.push_back(self.now);
    }

    fn relay(&mut self, transfer: Transfer) -> Result<()> {
        let Transfer { from, to, mut message, .. } = transfer;
        let id = message.id.clone();

        let receiver = &self.nodes[to.index()];
        if !receiver.holds(&id) && !receiver.delivered.contains(&id) {
            message.received_at = self.now;
            self.engines[to.index()].message_transferred(&mut message)?;

            let mut view = NodeView {
                addr: to,
                nodes: &mut self.nodes,
                links: &self.links,
                transfers: &mut self.transfers,
                stats: &mut self.stats,
                now: self.now,
            };
            view.make_room_for(message.size);
            view.add_message(message);
        }

        let mut view = NodeView {
            addr: from,
            nodes: &mut self.nodes,
            links: &self.links,
            transfers: &mut self.transfers,
            stats: &mut self.stats,
            now: self.now,
        };
        self.engines[from.index()].transfer_done(&mut view, &id)?;
        Ok(())
    }

    fn move_nodes(&mut self) {
        let (area, step) = (self.config.area, self.config.max_step);
        for node in &mut self.nodes {
            let dx = self.rng.gen_range(-step..=step);
            let dy = self.rng.gen_range(-step..=step);
            node.location = Location::new(
                (node.location.x + dx).clamp(0.0, area),
                (node.location.y + dy).clamp(0.0, area),
            );
        }
    }

    fn update_links(&mut self) {
        let range = self.config.radio_range;
        let mut current = BTreeSet::new();
        for (i, a) in self.nodes.iter().enumerate() {
            for b in &self.nodes[i + 1..] {
                if a.location.distance(&b.location) <= range {
                    current.insert(link(a.addr, b.addr));
                }
            }
        }

        let known = self.nodes.len();
        let went_down: Vec<Link> = self.links.difference(&current).copied().collect();
        let came_up: Vec<Link> = current.difference(&self.links).copied().collect();

        for &(a, b) in &went_down {
            self.engines[a.index()].changed_connection(&ConnectionEvent::down(b, known));
            self.engines[b.index()].changed_connection(&ConnectionEvent::down(a, known));

            let before = self.transfers.len();
            self.transfers.retain(|t| t.link() != (a, b));
            self.stats.aborted += (before - self.transfers.len()) as u64;
        }

        for &(a, b) in &came_up {
            trace!(%a, %b, "Link up");
            self.engines[a.index()].changed_connection(&ConnectionEvent::up(b, known));
            self.engines[b.index()].changed_connection(&ConnectionEvent::up(a, known));
        }

        if self.stats.gate_opened_at.is_none() && self.context.is_started() {
            self.stats.gate_opened_at = Some(self.now);
        }
        self.links = current;
    }

    fn expire(&mut self) {
        let now = self.now;
        let window = self.config.success_window;
        for node in &mut self.nodes {
            let before = node.buffer.len();
            node.buffer.retain(|m| !m.is_expired(now));
            self.stats.expired += (before - node.buffer.len()) as u64;
            node.prune_successes(now, window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_router::RouterConfig;

    fn small() -> SimulationConfig {
        SimulationConfig::default()
            .with_nodes(4)
            .with_geometry(100.0, 1_000.0)
            .with_steps(20)
            .with_message_interval(1_000)
    }

    #[test]
    fn everyone_in_range_links_everything() {
        let mut sim = Simulation::new(small()).unwrap();
        sim.step().unwrap();

        assert_eq!(sim.links().count(), 6);
        assert_eq!(sim.context().gate().network_size(), Some(4));
        assert_eq!(sim.context().encounter(NodeAddr(0), NodeAddr(3)), 1);
    }

    #[test]
    fn full_mesh_opens_gate_on_first_step() {
        let mut sim = Simulation::new(small()).unwrap();
        sim.step().unwrap();

        // 4 diagonal zeros < 16 * 0.25 is false, so the mesh alone is not enough
        assert_eq!(sim.stats().gate_opened_at, None);

        let mut sim = Simulation::new(small().with_router(RouterConfig::new(4).with_zero_threshold(0.5))).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.stats().gate_opened_at, Some(1));
    }

    #[test]
    fn injected_message_is_delivered_directly() {
        let mut sim = Simulation::new(small()).unwrap();
        sim.step().unwrap();

        sim.inject(NodeAddr(0), NodeAddr(2));
        assert_eq!(sim.buffer(NodeAddr(0)).len(), 1);

        sim.step().unwrap();
        assert_eq!(sim.transfers_in_flight(), 1);
        sim.step().unwrap();

        assert_eq!(sim.stats().delivered, 1);
        assert!(sim.buffer(NodeAddr(0)).is_empty());
        assert!(sim.buffer(NodeAddr(2)).is_empty());
    }

    #[test]
    fn out_of_range_nodes_never_link() {
        let config = small().with_geometry(10_000.0, 0.001);
        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..10 {
            sim.step().unwrap();
        }
        assert_eq!(sim.links().count(), 0);
        assert_eq!(sim.context().gate().network_size(), None);
    }

    #[test]
    fn nodes_stay_inside_area() {
        let mut sim = Simulation::new(small()).unwrap();
        for _ in 0..50 {
            sim.step().unwrap();
        }
        for n in 0..4 {
            let at = sim.location(NodeAddr(n)).unwrap();
            assert!((0.0..=100.0).contains(&at.x));
            assert!((0.0..=100.0).contains(&at.y));
        }
    }
}
