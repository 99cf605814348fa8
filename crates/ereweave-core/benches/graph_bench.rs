//! Benchmark: graph ingestion, traversal and facet search at various scales.
//!
//! Run with: cargo bench -p ereweave-core --bench graph_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ereweave_core::traversal::traverse;
use ereweave_core::{Constraint, Facet, Graph, HypothesisSearch, SearchConfig, Triple};
use std::hint::black_box;

/// Synthetic attack graph: `events` events, each with one attacker and
/// `targets` targets drawn from a shared pool of entities.
fn synthetic_triples(events: usize, targets: usize) -> Vec<Triple> {
    let entities = events.max(1);
    let mut triples = Vec::new();
    for e in 0..entities {
        triples.push(Triple::new(format!("E{e}"), "type", "Entity"));
    }
    for v in 0..events {
        let event = format!("V{v}");
        triples.push(Triple::new(event.as_str(), "type", "Event"));
        let mut stmt = |label: String, predicate: &str, object: String| {
            triples.push(Triple::new(label.as_str(), "type", "Statement"));
            triples.push(Triple::new(label.as_str(), "subject", event.as_str()));
            triples.push(Triple::new(label.as_str(), "predicate", predicate));
            triples.push(Triple::new(label, "object", object));
        };
        stmt(format!("V{v}-type"), "type", "Conflict.Attack".to_string());
        stmt(format!("V{v}-att"), "Attacker", format!("E{}", v % entities));
        for t in 0..targets {
            stmt(
                format!("V{v}-tgt{t}"),
                "Target",
                format!("E{}", (v + t + 1) % entities),
            );
        }
    }
    triples
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_ingest");
    group.sample_size(10);

    for events in [100usize, 1_000, 10_000] {
        let triples = synthetic_triples(events, 3);
        group.bench_with_input(BenchmarkId::from_parameter(events), &triples, |b, triples| {
            b.iter(|| black_box(Graph::from_triples(triples.iter().cloned())));
        });
    }
    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_traverse");
    group.sample_size(10);

    for events in [100usize, 1_000] {
        let graph = Graph::from_triples(synthetic_triples(events, 3));
        let excluded = SearchConfig::default().excluded_roles;
        group.bench_with_input(BenchmarkId::from_parameter(events), &graph, |b, graph| {
            b.iter(|| black_box(traverse(graph, "E0", &excluded).count()));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("facet_search");
    group.sample_size(10);

    let facet = Facet::new(vec![
        Constraint::new("?X", "Attacker", "E0"),
        Constraint::new("?X", "Target", "?Y"),
    ]);
    for targets in [1usize, 5, 20] {
        let graph = Graph::from_triples(synthetic_triples(1_000, targets));
        let search = HypothesisSearch::new(&graph, SearchConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(targets), &facet, |b, facet| {
            b.iter(|| black_box(search.run_facet(facet).len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_traverse, bench_search);
criterion_main!(benches);
