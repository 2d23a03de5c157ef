//! Deterministic two-group Lloyd's algorithm.
//!
//! # Seeding
//!
//! - seed 0 is the first point in enumeration order
//! - seed 1 is the point farthest from seed 0 (earliest wins ties)
//!
//! If every point equals the first there is nothing to split and all points
//! land in cluster 0. No randomness is involved, so the same input always
//! produces the same partition.
//!
//! # Iteration
//!
//! Assign each point to its nearer centroid (ties go to cluster 0), move each
//! centroid to the mean of its members, repeat until no assignment changes or
//! the iteration budget runs out. A cluster left without members keeps its
//! previous centroid.

use std::cmp::Ordering;

use crate::features::{FeatureVector, DISTANCE, ENCOUNTER, FEATURE_COUNT};

/// Result of splitting a candidate set in two.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Cluster (0 or 1) of each input point, in input order.
    pub labels: Vec<usize>,
    /// Mean of each cluster's members.
    pub centroids: [FeatureVector; 2],
    /// Member count of each cluster.
    pub sizes: [usize; 2],
    /// Assignment rounds performed.
    pub iterations: usize,
}

fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn assign(points: &[FeatureVector], centroids: &[FeatureVector; 2]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            if squared_distance(p, &centroids[1]) < squared_distance(p, &centroids[0]) {
                1
            } else {
                0
            }
        })
        .collect()
}

fn means(
    points: &[FeatureVector],
    labels: &[usize],
    previous: &[FeatureVector; 2],
) -> ([FeatureVector; 2], [usize; 2]) {
    let mut sums = [[0.0; FEATURE_COUNT]; 2];
    let mut sizes = [0usize; 2];

    for (point, &label) in points.iter().zip(labels) {
        sizes[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    let mut centroids = *previous;
    for cluster in 0..2 {
        if sizes[cluster] > 0 {
            let n = sizes[cluster] as f64;
            centroids[cluster] = sums[cluster].map(|s| s / n);
        }
    }
    (centroids, sizes)
}

/// Index of the point farthest from `origin`; the earliest on ties.
fn farthest_from(points: &[FeatureVector], origin: &FeatureVector) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, point) in points.iter().enumerate() {
        let d = squared_distance(point, origin);
        if d > best.map_or(0.0, |(_, bd)| bd) {
            best = Some((index, d));
        }
    }
    best.map(|(index, _)| index)
}

/// Split `points` into two clusters.
///
/// `max_iterations` bounds the assignment rounds; values below 1 are treated
/// as 1.
pub fn partition(points: &[FeatureVector], max_iterations: usize) -> Partition {
    let Some(first) = points.first() else {
        return Partition {
            labels: Vec::new(),
            centroids: [[0.0; FEATURE_COUNT]; 2],
            sizes: [0, 0],
            iterations: 0,
        };
    };

    let Some(second) = farthest_from(points, first) else {
        return Partition {
            labels: vec![0; points.len()],
            centroids: [*first, *first],
            sizes: [points.len(), 0],
            iterations: 0,
        };
    };

    let mut centroids = [*first, points[second]];
    let mut labels = assign(points, &centroids);
    let mut iterations = 1;

    while iterations < max_iterations.max(1) {
        let (updated, _) = means(points, &labels, &centroids);
        centroids = updated;
        let next = assign(points, &centroids);
        iterations += 1;
        if next == labels {
            break;
        }
        labels = next;
    }

    let (centroids, sizes) = means(points, &labels, &centroids);
    Partition {
        labels,
        centroids,
        sizes,
        iterations,
    }
}

/// The cluster whose members should receive the message.
///
/// Lower mean distance wins; on equal distance the higher mean encounter
/// count wins; otherwise cluster 0. An empty cluster is never positive
/// unless both are empty.
pub fn positive_cluster(partition: &Partition) -> usize {
    match partition.sizes {
        [_, 0] => return 0,
        [0, _] => return 1,
        _ => {}
    }

    let [c0, c1] = &partition.centroids;
    match c0[DISTANCE].partial_cmp(&c1[DISTANCE]) {
        Some(Ordering::Less) => 0,
        Some(Ordering::Greater) => 1,
        _ => {
            if c1[ENCOUNTER] > c0[ENCOUNTER] {
                1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(encounter: f64, distance: f64) -> FeatureVector {
        [encounter, distance, 0.0, 0.0]
    }

    #[test]
    fn empty_input() {
        let p = partition(&[], 10);
        assert!(p.labels.is_empty());
        assert_eq!(p.sizes, [0, 0]);
    }

    #[test]
    fn identical_points_stay_together() {
        let points = vec![point(0.5, 0.5); 4];
        let p = partition(&points, 10);
        assert_eq!(p.labels, vec![0; 4]);
        assert_eq!(p.sizes, [4, 0]);
        assert_eq!(positive_cluster(&p), 0);
    }

    #[test]
    fn separates_two_groups() {
        let points = vec![
            point(0.1, 0.1),
            point(0.9, 0.9),
            point(0.15, 0.05),
            point(0.85, 0.95),
            point(0.05, 0.12),
        ];
        let p = partition(&points, 100);

        assert_eq!(p.labels, vec![0, 1, 0, 1, 0]);
        assert_eq!(p.sizes, [3, 2]);
        assert!((p.centroids[1][DISTANCE] - 0.925).abs() < 1e-12);
        assert_eq!(positive_cluster(&p), 0);
    }

    #[test]
    fn positive_is_lower_distance_even_as_cluster_one() {
        let points = vec![point(0.9, 0.9), point(0.1, 0.1), point(0.95, 0.85)];
        let p = partition(&points, 100);
        assert_eq!(p.labels, vec![0, 1, 0]);
        assert_eq!(positive_cluster(&p), 1);
    }

    #[test]
    fn equal_distance_falls_back_to_encounters() {
        let p = Partition {
            labels: vec![0, 1],
            centroids: [point(0.2, 0.5), point(0.8, 0.5)],
            sizes: [1, 1],
            iterations: 1,
        };
        assert_eq!(positive_cluster(&p), 1);

        let tied = Partition {
            centroids: [point(0.5, 0.5), point(0.5, 0.5)],
            ..p
        };
        assert_eq!(positive_cluster(&tied), 0);
    }

    #[test]
    fn empty_cluster_is_never_positive() {
        let p = Partition {
            labels: vec![1, 1],
            centroids: [point(0.0, 0.0), point(1.0, 1.0)],
            sizes: [0, 2],
            iterations: 2,
        };
        assert_eq!(positive_cluster(&p), 1);
    }

    #[test]
    fn iteration_budget_is_respected() {
        let points: Vec<_> = (0..20).map(|i| point(i as f64 / 20.0, (i * 7 % 20) as f64 / 20.0)).collect();
        let p = partition(&points, 1);
        assert_eq!(p.iterations, 1);
        assert_eq!(p.sizes[0] + p.sizes[1], 20);

        let p = partition(&points, 0);
        assert_eq!(p.iterations, 1);
    }

    #[test]
    fn deterministic() {
        let points: Vec<_> = (0..15).map(|i| point((i * 3 % 15) as f64 / 15.0, (i * 11 % 15) as f64 / 15.0)).collect();
        assert_eq!(partition(&points, 100), partition(&points, 100));
    }

    fn groups() -> impl Strategy<Value = (Vec<FeatureVector>, Vec<bool>)> {
        let near = (0.0..0.05f64, 0.0..0.05f64).prop_map(|(a, b)| (point(0.1 + a, 0.1 + b), true));
        let far = (0.0..0.05f64, 0.0..0.05f64).prop_map(|(a, b)| (point(0.9 - a, 0.9 - b), false));
        (
            proptest::collection::vec(near, 1..6),
            proptest::collection::vec(far, 1..6),
        )
            .prop_flat_map(|(near, far)| {
                let all: Vec<_> = near.into_iter().chain(far).collect();
                Just(all).prop_shuffle()
            })
            .prop_map(|all: Vec<(FeatureVector, bool)>| -> (Vec<FeatureVector>, Vec<bool>) {
                all.into_iter().unzip()
            })
    }

    proptest! {
        #[test]
        fn lower_distance_group_is_positive_in_any_order((points, is_near) in groups()) {
            let p = partition(&points, 100);
            let positive = positive_cluster(&p);
            for (label, near) in p.labels.iter().zip(&is_near) {
                prop_assert_eq!(*label == positive, *near);
            }
        }
    }
}
