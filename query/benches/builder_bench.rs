use std::collections::HashSet;
use std::env;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use query::{NetworkBuilder, ThresholdTable};
use simgraph_core::embedding::deterministic_embedding;
use simgraph_core::model::{Item, QUERY_NODE_ID};

const DIMS: usize = 64;
const MODEL_ID: &str = "deterministic-v1";

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn catalog(size: usize) -> Vec<Item> {
    (0..size)
        .map(|i| {
            let name = format!("Club {i}");
            let text = format!("{name} weekly meetups and events");
            Item {
                embedding: deterministic_embedding(&text, MODEL_ID, DIMS),
                name,
                tags: Vec::new(),
                description: String::new(),
            }
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let max_size = env_usize("SIMGRAPH_BENCH_ITEMS", 500);
    // Low thresholds keep every level saturated.
    let builder = NetworkBuilder::new(
        ThresholdTable::new(vec![0.1, 0.05, 0.0]).unwrap_or_default(),
    );
    let query_embedding = deterministic_embedding("outdoor activities", MODEL_ID, DIMS);
    let excluded = HashSet::from(["outdoor activities".to_string()]);

    let mut group = c.benchmark_group("expand");
    for size in [max_size / 5, max_size] {
        let items = catalog(size.max(1));
        group.bench_with_input(BenchmarkId::from_parameter(items.len()), &items, |b, items| {
            b.iter(|| {
                let mut visited = HashSet::new();
                let network = builder.expand(
                    black_box(items),
                    QUERY_NODE_ID,
                    black_box(&query_embedding),
                    &excluded,
                    0,
                    &mut visited,
                );
                black_box(network.nodes.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
