//! Benchmarks for the diff engine.
//!
//! Polling drivers diff every result set on every tick, so the common case
//! (few changes in a large set) should stay close to linear.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liveset_cache::IdMap;
use liveset_core::{doc, Document, Id};
use liveset_diff::{diff_ordered, diff_unordered, DiffOptions};
use serde_json::json;

fn make_list(size: u64) -> Vec<(Id, Document)> {
    (0..size)
        .map(|i| (Id::from(i), doc([("n", json!(i)), ("name", json!(format!("doc{i}")))])))
        .collect()
}

fn bench_ordered(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_ordered");

    for size in [100u64, 1000, 10000] {
        let old = make_list(size);

        // No changes
        group.bench_with_input(BenchmarkId::new("unchanged", size), &old, |b, old| {
            b.iter(|| diff_ordered(black_box(old), black_box(old), &DiffOptions::default()))
        });

        // One document moved from the end to the front
        let mut rotated = old.clone();
        rotated.rotate_right(1);
        group.bench_with_input(
            BenchmarkId::new("single_move", size),
            &(old.clone(), rotated),
            |b, (old, new)| {
                b.iter(|| diff_ordered(black_box(old), black_box(new), &DiffOptions::default()))
            },
        );

        // Every document moved
        let mut reversed = old.clone();
        reversed.reverse();
        if size <= 1000 {
            group.bench_with_input(
                BenchmarkId::new("reversed", size),
                &(old.clone(), reversed),
                |b, (old, new)| {
                    b.iter(|| diff_ordered(black_box(old), black_box(new), &DiffOptions::default()))
                },
            );
        }
    }

    group.finish();
}

fn bench_unordered(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_unordered");

    for size in [100u64, 1000, 10000] {
        let old: IdMap<Document> = make_list(size).into_iter().collect();
        let mut new = old.clone();
        if let Some(d) = new.get_mut(&Id::from(0u64)) {
            d.insert("n".into(), json!(-1));
        }
        new.remove(&Id::from(1u64));

        group.bench_with_input(
            BenchmarkId::new("one_change_one_remove", size),
            &(old, new),
            |b, (old, new)| {
                b.iter(|| diff_unordered(black_box(old), black_box(new), &DiffOptions::default()))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ordered, bench_unordered);
criterion_main!(benches);
