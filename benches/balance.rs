//! Benchmarks for row balancing and page splitting.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tabula::layout::LayoutEngine;
use tabula::model::{Cell, Table};

/// A two-column table of `groups` row-span groups, three rows each.
fn span_table(groups: usize) -> Table {
    let mut table = Table::new(vec![1.0, 3.0]).expect("valid columns");
    for i in 0..groups {
        table
            .add_cell(Cell::text(&format!("Group {i}\nspanning\nthree rows\nwith a tall label")).with_row_span(3))
            .expect("valid cell");
        for r in 0..3 {
            table
                .add_cell(Cell::text(&format!("Entry {r} of group {i} with some content text.")))
                .expect("valid cell");
        }
    }
    table
}

fn bench_balance(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance_rows");
    let engine = LayoutEngine::new();

    for n in [100, 1000, 3000] {
        let table = span_table(n);
        let widths = engine
            .resolve_column_widths(&table, 480.0)
            .expect("positive width");
        group.bench_with_input(
            BenchmarkId::new("balance_row_heights", format!("{}_rows", n * 3)),
            &table,
            |b, table| {
                b.iter(|| engine.balance_row_heights(black_box(table), &widths));
            },
        );
    }

    group.finish();
}

fn bench_paginate(c: &mut Criterion) {
    let mut group = c.benchmark_group("paginate");
    let engine = LayoutEngine::new();

    for n in [100, 1000, 3000] {
        let table = span_table(n);
        group.bench_with_input(
            BenchmarkId::new("layout", format!("{}_rows", n * 3)),
            &table,
            |b, table| {
                b.iter(|| engine.layout(black_box(table), 480.0, &700.0));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_balance, bench_paginate);
criterion_main!(benches);
