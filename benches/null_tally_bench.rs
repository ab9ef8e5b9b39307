//! Compare sequential vs parallel null tallying of one full page.
//!
//! Run with: `cargo bench --bench null_tally`
//! Or quick comparison: `cargo run --bin benchmark_tally_speedup` (see src/bin)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nullwatch::inspect::{tally, tally_parallel, FieldSet};
use serde_json::{json, Value};

fn page(records: usize) -> (FieldSet, Vec<Value>) {
    let fields = FieldSet::from_names(["id", "vendor", "amount", "agency", "fiscal_year", "location"]);
    let batch = (0..records)
        .map(|i| match i % 4 {
            0 => json!({"id": i, "vendor": "Acme", "amount": "10.00", "agency": "DoIT", "fiscal_year": "2018"}),
            1 => json!({"id": i, "amount": "4.50", "agency": "MDOT"}),
            2 => json!({"id": i, "vendor": "Initech", "fiscal_year": "2019", "location": {"type": "Point"}}),
            _ => json!({"id": i}),
        })
        .collect();
    (fields, batch)
}

fn bench_tally_sequential_vs_parallel(c: &mut Criterion) {
    let (fields, batch) = page(20_000);

    let mut group = c.benchmark_group("null_tally");
    group.sample_size(20);

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(tally(&fields, &batch)));
    });

    group.bench_function("parallel", |b| {
        b.iter(|| black_box(tally_parallel(&fields, &batch)));
    });

    group.finish();
}

criterion_group!(benches, bench_tally_sequential_vs_parallel);
criterion_main!(benches);
