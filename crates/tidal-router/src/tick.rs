//! The per-opportunity tick.

use rand::seq::SliceRandom;
use tidal_contact::{ContactLedger, NodeAddr};
use tidal_scoring::{
    distance_sum, gamma, select_relay, FeatureVector, RatioCandidate, DISTANCE, ENCOUNTER,
    FEATURE_COUNT, OCCUPANCY, SUCCESS,
};
use tracing::{debug, trace};

use crate::host::{Handoff, NodeDirectory, RouterHost};
use crate::replica;
use crate::{Message, QueueMode, RelayEngine, Scheme};

/// Which step ended a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The node cannot start a transfer or already has one running.
    Busy,
    /// A direct delivery to a connected destination started.
    Delivered(Handoff),
    /// Contact history is still too sparse to relay.
    GateClosed,
    /// No connection or no message produced a handoff request.
    NoCandidates,
    /// One of the `requested` handoffs started.
    Started { handoff: Handoff, requested: usize },
    /// Handoffs were requested but the host started none of them.
    Deferred { requested: usize },
}

impl TickOutcome {
    /// The transfer started during this tick, if any.
    pub fn started(&self) -> Option<&Handoff> {
        match self {
            TickOutcome::Delivered(handoff) | TickOutcome::Started { handoff, .. } => Some(handoff),
            _ => None,
        }
    }
}

impl RelayEngine {
    /// Run one tick for this node.
    ///
    /// Tries direct delivery, then (once the gate is open) scores every
    /// in-scope message against the current connections and passes the
    /// selected handoffs to the host in one batch. Nothing is mutated when
    /// the node is busy, unconnected or the gate is closed.
    ///
    /// A message without a usable replica count is skipped for the tick; the
    /// rest are still scored.
    pub fn update<H, D>(&mut self, host: &mut H, directory: &D) -> TickOutcome
    where
        H: RouterHost + ?Sized,
        D: NodeDirectory + ?Sized,
    {
        if !host.can_start_transfer() || host.is_transferring() {
            return TickOutcome::Busy;
        }

        if let Some(handoff) = host.exchange_deliverable_messages() {
            debug!(node = %self.address, message = %handoff.message, peer = %handoff.peer, "Direct delivery");
            return TickOutcome::Delivered(handoff);
        }

        if !self.context.is_started() {
            return TickOutcome::GateClosed;
        }

        if host.connections().is_empty() {
            return TickOutcome::NoCandidates;
        }

        let handoffs = match self.config.scheme {
            Scheme::Ratio => self.ratio_handoffs(&*host, directory),
            Scheme::Cluster => self.cluster_handoffs(&*host, directory),
        };
        if handoffs.is_empty() {
            return TickOutcome::NoCandidates;
        }

        for handoff in &handoffs {
            debug!(node = %self.address, message = %handoff.message, peer = %handoff.peer, "Requesting handoff");
        }

        let requested = handoffs.len();
        match host.try_messages_for_connected(&handoffs) {
            Some(handoff) => TickOutcome::Started { handoff, requested },
            None => TickOutcome::Deferred { requested },
        }
    }

    /// Order held messages by the configured queue mode.
    fn queue<'h>(&mut self, mut messages: Vec<&'h Message>) -> Vec<&'h Message> {
        match self.config.queue_mode {
            QueueMode::Fifo => {
                messages.sort_by(|a, b| (a.received_at, &a.id).cmp(&(b.received_at, &b.id)));
            }
            QueueMode::Random => {
                // Hosts need not enumerate their buffer stably
                messages.sort_by(|a, b| a.id.cmp(&b.id));
                messages.shuffle(&mut self.rng);
            }
        }
        messages
    }

    /// One handoff per message, to the best-scoring free candidate that
    /// outranks this node itself.
    fn ratio_handoffs<H, D>(&mut self, host: &H, directory: &D) -> Vec<Handoff>
    where
        H: RouterHost + ?Sized,
        D: NodeDirectory + ?Sized,
    {
        let free: Vec<RatioCandidate> = host
            .connections()
            .into_iter()
            .filter(|peer| !host.peer_is_transferring(*peer))
            .map(|addr| RatioCandidate {
                addr,
                location: directory.location(addr),
            })
            .collect();
        if free.is_empty() {
            return Vec::new();
        }

        let known = directory.known_nodes();
        let here = directory.location(self.address);
        let messages = self.queue(host.messages());
        let ledger = self.context.ledger();

        let mut handoffs = Vec::new();
        for message in messages {
            let candidates: Vec<RatioCandidate> = free
                .iter()
                .filter(|c| !host.peer_has_message(c.addr, &message.id))
                .copied()
                .collect();

            let destination = directory.location(message.to);
            let sum = distance_sum(destination, known.iter().map(|n| directory.location(*n)));

            let Some(choice) = select_relay(&ledger, message.to, destination, &candidates, sum) else {
                continue;
            };
            let own = gamma(&ledger, message.to, self.address, here.distance(&destination), sum);
            if choice.score > own {
                trace!(message = %message.id, relay = %choice.addr, score = ?choice.score, ?own, "Selected relay");
                handoffs.push(Handoff::new(message.id.clone(), choice.addr));
            } else {
                trace!(message = %message.id, best = ?choice.score, ?own, "Keeping message, no better relay");
            }
        }
        handoffs
    }

    /// Handoffs to every free member of each message's positive cluster.
    fn cluster_handoffs<H, D>(&mut self, host: &H, directory: &D) -> Vec<Handoff>
    where
        H: RouterHost + ?Sized,
        D: NodeDirectory + ?Sized,
    {
        let peers = host.connections();
        let messages = self.queue(host.messages());
        let ledger = self.context.ledger();

        let mut handoffs = Vec::new();
        for message in messages {
            // A violation is logged by `copies` and only skips this message
            match replica::copies(message) {
                Ok(copies) if copies > 1 => {}
                _ => continue,
            }

            let rows = feature_rows(&ledger, directory, message, &peers);
            let classification = self.classifier.classify(rows);

            for index in classification.positive_indices() {
                let peer = peers[index];
                if host.peer_is_transferring(peer) || host.peer_has_message(peer, &message.id) {
                    continue;
                }
                handoffs.push(Handoff::new(message.id.clone(), peer));
            }
        }
        handoffs
    }
}

/// Raw feature rows for `message`, one per peer in enumeration order.
fn feature_rows<D>(
    ledger: &ContactLedger,
    directory: &D,
    message: &Message,
    peers: &[NodeAddr],
) -> Vec<FeatureVector>
where
    D: NodeDirectory + ?Sized,
{
    let destination = directory.location(message.to);
    peers
        .iter()
        .map(|&peer| {
            let mut row = [0.0; FEATURE_COUNT];
            row[ENCOUNTER] = ledger.encounter(peer, message.to) as f64;
            row[DISTANCE] = directory.location(peer).distance(&destination);
            row[OCCUPANCY] = directory.buffer_occupancy(peer);
            row[SUCCESS] = f64::from(directory.recent_successes(peer));
            row
        })
        .collect()
}
