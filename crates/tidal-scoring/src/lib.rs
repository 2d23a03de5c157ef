//! Tidal Relay Scoring
//!
//! Two interchangeable ways to pick relays for a message that cannot yet
//! reach its destination directly.
//!
//! # Likelihood ratio ("gamma")
//!
//! ```text
//! alpha(R) = count[D][R] / total[D]
//! beta(R)  = dist(R, D) / Σ_n dist(n, D)
//! gamma(R) = alpha(R) / beta(R)
//! ```
//!
//! The single candidate with the highest gamma gets the message. A relay
//! sitting on top of the destination has `beta = 0` and scores
//! [`Score::Maximal`].
//!
//! # Two-cluster classifier
//!
//! Every candidate becomes a 4-feature vector (encounters with the
//! destination, distance to it, buffer occupancy, recent successes). The
//! columns are min-max normalised and split into two groups by Lloyd's
//! algorithm with deterministic seeding. The group closer to the destination
//! is the positive cluster and every member of it gets a copy.
//!
//! Both scorers are pure functions of their inputs: same ledger, positions
//! and enumeration order give the same answer on every run.

mod classifier;
mod cluster;
mod features;
mod location;
mod ratio;

pub use classifier::{ClusterClassifier, Classification, DEFAULT_MAX_ITERATIONS};
pub use cluster::{partition, positive_cluster, Partition};
pub use features::{
    normalize, FeatureVector, DISTANCE, ENCOUNTER, FEATURE_COUNT, OCCUPANCY, SUCCESS,
};
pub use location::Location;
pub use ratio::{distance_sum, gamma, select_relay, RatioCandidate, RelayChoice, Score};
