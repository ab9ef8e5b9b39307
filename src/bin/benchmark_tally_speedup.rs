//! Tally one synthetic page sequentially and in parallel, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_tally_speedup

use std::time::Instant;

use nullwatch::inspect::{tally, tally_parallel, FieldSet};
use nullwatch::parallel::WorkerPool;
use serde_json::{Map, Value};

fn main() {
    let field_count = 60;
    let record_count = 20_000;
    let names: Vec<String> = (0..field_count).map(|i| format!("field_{i}")).collect();
    let fields = FieldSet::from_names(names.clone());

    // Every seventh cell is left out so the tally has something to count.
    let records: Vec<Value> = (0..record_count)
        .map(|row| {
            let record: Map<String, Value> = names
                .iter()
                .enumerate()
                .filter(|(col, _)| (row + col) % 7 != 0)
                .map(|(_, name)| (name.clone(), Value::from(row)))
                .collect();
            Value::Object(record)
        })
        .collect();

    println!("Null tally: {record_count} records x {field_count} fields");
    println!();

    let t0 = Instant::now();
    let sequential = tally(&fields, &records);
    let seq_ms = t0.elapsed().as_secs_f64() * 1000.0;
    println!("Sequential:  {seq_ms:.2} ms");

    let t0 = Instant::now();
    let parallel = WorkerPool::default_workers().install(|| tally_parallel(&fields, &records));
    let par_ms = t0.elapsed().as_secs_f64() * 1000.0;
    println!("Parallel:    {par_ms:.2} ms");

    println!();
    println!("Speedup:     {:.2}x faster (parallel vs sequential)", seq_ms / par_ms);

    assert_eq!(sequential, parallel, "parallel tally must match sequential tally");
    println!("(Totals match sequential vs parallel: {} nulls)", sequential.total());
}
