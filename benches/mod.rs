use criterion::{Criterion, criterion_group, criterion_main};
use matchbook_rs::prelude::*;
use std::hint::black_box;
use std::sync::Arc;

fn seeded_book(levels: u64, orders_per_level: u64) -> DepthOrderBook<SimpleOrder> {
    let mut book = DepthOrderBook::new("BENCH");
    for level in 0..levels {
        for _ in 0..orders_per_level {
            book.add(
                Arc::new(SimpleOrder::limit(Side::Buy, 9_900 - level, 10)),
                OrderConditions::empty(),
            );
            book.add(
                Arc::new(SimpleOrder::limit(Side::Sell, 10_000 + level, 10)),
                OrderConditions::empty(),
            );
        }
    }
    book.perform_callbacks();
    book
}

fn bench_add_only(c: &mut Criterion) {
    c.bench_function("add_only_resting", |b| {
        b.iter_batched(
            || seeded_book(10, 4),
            |mut book| {
                for i in 0..100u64 {
                    book.add(
                        Arc::new(SimpleOrder::limit(Side::Buy, 9_850 - (i % 25), 10)),
                        OrderConditions::empty(),
                    );
                }
                book.perform_callbacks();
                black_box(book)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_cancel_only(c: &mut Criterion) {
    c.bench_function("cancel_only", |b| {
        b.iter_batched(
            || {
                let mut book = DepthOrderBook::new("BENCH");
                let orders: Vec<Arc<SimpleOrder>> = (0..100u64)
                    .map(|i| Arc::new(SimpleOrder::limit(Side::Buy, 9_000 + (i % 20), 10)))
                    .collect();
                for order in &orders {
                    book.add(Arc::clone(order), OrderConditions::empty());
                }
                book.perform_callbacks();
                (book, orders)
            },
            |(mut book, orders)| {
                for order in &orders {
                    book.cancel(order);
                }
                book.perform_callbacks();
                black_box(book)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_aggressive_walk(c: &mut Criterion) {
    c.bench_function("aggressive_walk", |b| {
        b.iter_batched(
            || seeded_book(20, 4),
            |mut book| {
                // One order sweeping many resting levels.
                book.add(
                    Arc::new(SimpleOrder::limit(Side::Buy, 10_030, 700)),
                    OrderConditions::empty(),
                );
                book.perform_callbacks();
                black_box(book)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_add_only,
    bench_cancel_only,
    bench_aggressive_walk
);
criterion_main!(benches);
