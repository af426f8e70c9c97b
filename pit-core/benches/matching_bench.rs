use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use pit_core::prelude::*;
use rand::Rng;

fn funded_game(users: u32) -> Game {
    let game = Game::new();
    for user_id in 1..=users {
        game.register(user_id, 100_000_000, 100_000_000);
    }
    game
}

fn random_orders(count: usize) -> Vec<(Side, UserId, Price, Volume)> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            let side = if rng.random_bool(0.5) {
                Side::Buy
            } else {
                Side::Sell
            };
            (
                side,
                rng.random_range(1..=100),
                rng.random_range(MIN_PRICE..=MAX_PRICE),
                rng.random_range(MIN_VOLUME..=MAX_VOLUME),
            )
        })
        .collect()
}

fn bench_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("placing 10k random orders");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("place 10k", |b| {
        b.iter_batched(
            || (funded_game(100), random_orders(10_000)),
            |(game, orders)| {
                let book = game.book(Asset::Bread);
                for (side, user_id, price, volume) in orders {
                    let _ = book.place(side, user_id, price, volume);
                }
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_deep_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweeping a deep book");
    group.throughput(Throughput::Elements(1));
    group.bench_function("buy through 100 ask levels", |b| {
        b.iter_batched(
            || {
                let game = funded_game(2);
                let book = game.book(Asset::Cheese);
                for price in 101..=200 {
                    book.place(Side::Sell, 1, price, 2).unwrap();
                }
                game
            },
            |game| {
                game.book(Asset::Cheese)
                    .place(Side::Buy, 2, 200, 200)
                    .unwrap();
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn stress_multi_thread_benchmark(c: &mut Criterion) {
    let game = Arc::new(funded_game(100));
    let handles = spawn_workers(&game);

    let mut group = c.benchmark_group("reads under write load");
    group.throughput(Throughput::Elements(1));
    group.bench_function("leaderboard while two books trade", |b| {
        let running = Arc::new(AtomicBool::new(true));

        let writers: Vec<_> = [Asset::Bread, Asset::Cheese]
            .into_iter()
            .map(|asset| {
                let handle = handles[asset.index()].clone();
                let writer_running = Arc::clone(&running);
                thread::spawn(move || {
                    let mut rng = rand::rng();
                    while writer_running.load(Ordering::Relaxed) {
                        let side = if rng.random_bool(0.5) {
                            Side::Buy
                        } else {
                            Side::Sell
                        };
                        let _ = handle.place(
                            side,
                            rng.random_range(1..=100),
                            rng.random_range(MIN_PRICE..=MAX_PRICE),
                            rng.random_range(MIN_VOLUME..=MAX_VOLUME),
                        );
                    }
                })
            })
            .collect();

        b.iter(|| game.leaderboard());

        running.store(false, Ordering::Relaxed);
        for writer in writers {
            writer.join().unwrap();
        }
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_placement,
    bench_deep_sweep,
    stress_multi_thread_benchmark
);
criterion_main!(benches);
