//! Benchmarks `OrderBook::apply`, the hot path that must stay sub-microsecond.

use common::{L2Update, Px, Qty, Side, Symbol, Ts};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lob::OrderBook;
use rand::Rng;

fn bench_apply_update(c: &mut Criterion) {
    let symbol = Symbol::new("BTCUSDT");
    let mut book = OrderBook::new(symbol);
    let mut rng = rand::thread_rng();

    c.bench_function("apply_update_bid", |b| {
        b.iter(|| {
            let level = rng.gen_range(0..10u8);
            let price = 100.0 - f64::from(level) * 0.1;
            let update = L2Update::new(
                Ts::from_nanos(1),
                symbol,
                Side::Bid,
                Px::new(price),
                Qty::new(10.0),
                level,
            );
            let _ = black_box(book.apply(&update));
        });
    });

    c.bench_function("apply_update_ask", |b| {
        b.iter(|| {
            let level = rng.gen_range(0..10u8);
            let price = 101.0 + f64::from(level) * 0.1;
            let update = L2Update::new(
                Ts::from_nanos(1),
                symbol,
                Side::Ask,
                Px::new(price),
                Qty::new(10.0),
                level,
            );
            let _ = black_box(book.apply(&update));
        });
    });

    c.bench_function("to_canonical", |b| {
        b.iter(|| black_box(book.to_canonical()));
    });
}

criterion_group!(benches, bench_apply_update);
criterion_main!(benches);
