//! Benchmarks for relay scoring
//!
//! Measures performance of:
//! - Two-cluster classification at typical neighbor counts
//! - Likelihood-ratio selection over a dense ledger

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tidal_contact::{ContactLedger, ContactPolicy, NodeAddr};
use tidal_scoring::{
    distance_sum, select_relay, ClusterClassifier, FeatureVector, Location, RatioCandidate,
};

/// Deterministic pseudo-random features without pulling in an RNG.
fn features(count: usize) -> Vec<FeatureVector> {
    (0..count)
        .map(|i| {
            let i = i as f64;
            [
                (i * 7.0) % 13.0,
                (i * 37.0) % 500.0,
                ((i * 3.0) % 10.0) / 10.0,
                (i * 5.0) % 4.0,
            ]
        })
        .collect()
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let classifier = ClusterClassifier::default();

    for &count in &[2usize, 8, 32, 128] {
        let input = features(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| classifier.classify(black_box(input.clone())))
        });
    }
    group.finish();
}

fn bench_select_relay(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_relay");

    for &nodes in &[16u32, 128, 1024] {
        let mut ledger = ContactLedger::with_capacity(nodes as usize, ContactPolicy::Symmetric);
        for a in 0..nodes {
            ledger.record_contact(NodeAddr(a), NodeAddr((a * 7 + 1) % nodes));
        }
        let locations: Vec<_> = (0..nodes)
            .map(|a| Location::new((a % 32) as f64 * 10.0, (a / 32) as f64 * 10.0))
            .collect();
        let candidates: Vec<_> = (1..nodes.min(20))
            .map(|a| RatioCandidate {
                addr: NodeAddr(a),
                location: locations[a as usize],
            })
            .collect();
        let dest = locations[0];
        let sum = distance_sum(dest, locations.iter().copied());

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &candidates, |b, candidates| {
            b.iter(|| select_relay(&ledger, NodeAddr(0), dest, black_box(candidates), sum))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_select_relay);
criterion_main!(benches);
