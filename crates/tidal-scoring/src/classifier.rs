//! Two-cluster relay classifier.

use tracing::trace;

use crate::cluster::{partition, positive_cluster, Partition};
use crate::features::{normalize, FeatureVector};

/// Default bound on Lloyd iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Outcome of classifying one message's candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// No candidates: nothing to do.
    Empty,
    /// Exactly one candidate: offered to it without clustering.
    Single,
    /// Two or more candidates split into two clusters.
    Clustered {
        partition: Partition,
        positive: usize,
    },
}

impl Classification {
    /// Indices of every candidate that should be offered the message.
    pub fn positive_indices(&self) -> Vec<usize> {
        match self {
            Classification::Empty => Vec::new(),
            Classification::Single => vec![0],
            Classification::Clustered { partition, positive } => partition
                .labels
                .iter()
                .enumerate()
                .filter(|(_, label)| *label == positive)
                .map(|(index, _)| index)
                .collect(),
        }
    }
}

/// Normalises candidate features and splits them into relay / non-relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterClassifier {
    max_iterations: usize,
}

impl Default for ClusterClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl ClusterClassifier {
    /// Create a classifier with an iteration bound.
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    /// The iteration bound in force.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Classify raw (un-normalised) candidate features, in enumeration order.
    pub fn classify(&self, mut features: Vec<FeatureVector>) -> Classification {
        match features.len() {
            0 => Classification::Empty,
            1 => Classification::Single,
            _ => {
                normalize(&mut features);
                let partition = partition(&features, self.max_iterations);
                let positive = positive_cluster(&partition);
                trace!(
                    candidates = features.len(),
                    iterations = partition.iterations,
                    sizes = ?partition.sizes,
                    centroids = ?partition.centroids,
                    positive,
                    "Clustered relay candidates"
                );
                Classification::Clustered {
                    partition,
                    positive,
                }
            }
        }
    }
}
