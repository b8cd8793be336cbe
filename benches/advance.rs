//! Benchmarks for the particle flow engine.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Map, Value, json};

use particle_flow::{
    compute::{ColumnLayout, FlowEngine, GeometryCache, Layout},
    schema::{DatasetShape, EngineConfig, LayoutConfig},
};

/// Two-level dataset with `leaves` terminals split over four parents.
fn dataset(leaves: usize) -> String {
    let mut root = Map::new();
    for p in 0..4 {
        let mut children = Map::new();
        for l in (p..leaves).step_by(4) {
            children.insert(
                format!("leaf{l}"),
                json!({"males": 10 + l, "females": 5 + 2 * l}),
            );
        }
        root.insert(format!("parent{p}"), Value::Object(children));
    }
    Value::Object(root).to_string()
}

fn engine(leaves: usize, population: usize) -> FlowEngine {
    let config = EngineConfig {
        population_cap: Some(population),
        random_seed: Some(42),
        density: 50,
        ..Default::default()
    };
    let mut engine =
        FlowEngine::from_json_str(&dataset(leaves), &DatasetShape::default(), config).unwrap();
    engine.apply_layout(&ColumnLayout::new(LayoutConfig::nested(1200.0)));
    engine
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance");

    for population in [100, 1_000, 10_000] {
        let mut engine = engine(16, population);
        // Fill the population before measuring.
        let mut tick = 0;
        while engine.state().particles.len() < population {
            tick += 1;
            engine.advance(tick).unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(population),
            &population,
            |b, _| {
                b.iter(|| {
                    tick += 1;
                    black_box(engine.advance(tick).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_step_only(c: &mut Criterion) {
    let mut engine = engine(16, 1_000);
    let mut tick = 0;
    while engine.state().particles.len() < 1_000 {
        tick += 1;
        engine.advance(tick).unwrap();
    }

    c.bench_function("step_only_1000", |b| {
        b.iter(|| black_box(engine.step_only(black_box(tick))));
    });
}

fn bench_geometry_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry_cache");

    for leaves in [4, 16, 64] {
        let engine = engine(leaves, 10);
        let layout = ColumnLayout::new(LayoutConfig::nested(1200.0))
            .layout(engine.hierarchy(), engine.routes());

        group.bench_with_input(BenchmarkId::from_parameter(leaves), &leaves, |b, _| {
            b.iter(|| GeometryCache::build(black_box(&layout.curves)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_advance, bench_step_only, bench_geometry_cache);
criterion_main!(benches);
