//! Likelihood-ratio relay selection.
//!
//! `alpha` measures how often the destination has met the relay relative to
//! all of the destination's meetings; `beta` measures how far the relay is
//! from the destination relative to everybody else. High `alpha / beta`
//! means a frequent, nearby contact of the destination.

use std::cmp::Ordering;

use tidal_contact::{ContactLedger, NodeAddr};
use tracing::trace;

use crate::Location;

/// Relay score under the likelihood-ratio scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// `alpha / beta` for a relay at non-zero distance.
    Finite(f64),
    /// The relay is co-located with the destination (`beta == 0`).
    Maximal,
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Score::Maximal, Score::Maximal) => Some(Ordering::Equal),
            (Score::Maximal, Score::Finite(_)) => Some(Ordering::Greater),
            (Score::Finite(_), Score::Maximal) => Some(Ordering::Less),
            (Score::Finite(a), Score::Finite(b)) => a.partial_cmp(b),
        }
    }
}

/// A connected peer considered as relay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioCandidate {
    pub addr: NodeAddr,
    pub location: Location,
}

/// The relay picked for one message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayChoice {
    /// Position of the winner in the candidate slice.
    pub index: usize,
    pub addr: NodeAddr,
    pub score: Score,
}

/// Sum of distances from every known node to the destination.
pub fn distance_sum<I>(destination: Location, known: I) -> f64
where
    I: IntoIterator<Item = Location>,
{
    known.into_iter().map(|n| n.distance(&destination)).sum()
}

/// Score `relay` for a message to `destination`.
///
/// `distance` is the relay's distance to the destination and
/// `distance_sum` the same distance summed over all known nodes.
pub fn gamma(
    ledger: &ContactLedger,
    destination: NodeAddr,
    relay: NodeAddr,
    distance: f64,
    distance_sum: f64,
) -> Score {
    if distance == 0.0 {
        return Score::Maximal;
    }

    let total = ledger.total(destination);
    let alpha = if total == 0 {
        0.0
    } else {
        ledger.encounter(destination, relay) as f64 / total as f64
    };

    // distance > 0, so a zero sum gives beta = inf and gamma = 0
    let beta = distance / distance_sum;
    Score::Finite(alpha / beta)
}

/// Pick the candidate with the highest gamma.
///
/// Ties keep the earliest candidate in slice order. Returns `None` only for
/// an empty slice.
pub fn select_relay(
    ledger: &ContactLedger,
    destination: NodeAddr,
    destination_location: Location,
    candidates: &[RatioCandidate],
    distance_sum: f64,
) -> Option<RelayChoice> {
    let mut best: Option<RelayChoice> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let distance = candidate.location.distance(&destination_location);
        let score = gamma(ledger, destination, candidate.addr, distance, distance_sum);
        trace!(relay = %candidate.addr, %destination, ?score, "Scored relay");

        let better = match &best {
            None => true,
            Some(current) => score > current.score,
        };
        if better {
            best = Some(RelayChoice {
                index,
                addr: candidate.addr,
                score,
            });
        }
    }

    best
}
