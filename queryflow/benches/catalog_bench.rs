//! Benchmarks for catalog rendering.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use queryflow::builtins;
use queryflow::stage::Stage;

fn render_benchmark(c: &mut Criterion) {
    c.bench_function("render_builtin_catalog", |b| {
        let defs = builtins::definitions();
        b.iter(|| {
            for def in &defs {
                black_box(def.rendered_stages());
            }
        })
    });

    c.bench_function("parse_builtin_catalog", |b| {
        let rendered: Vec<_> = builtins::definitions()
            .iter()
            .flat_map(|def| def.rendered_stages())
            .collect();
        b.iter(|| {
            for stage in &rendered {
                black_box(Stage::from_value(stage).ok());
            }
        })
    });
}

criterion_group!(benches, render_benchmark);
criterion_main!(benches);
