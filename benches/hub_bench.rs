//! Benchmarks for the broadcast hub
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hostpulse::websocket::{Hub, HubConfig, Update};
use std::sync::Arc;

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let update = Update::from("x".repeat(4096));

    for subscribers in [1, 100, 1000] {
        let hub = Arc::new(Hub::new(HubConfig::default()));
        let mut subscriptions: Vec<_> = (0..subscribers).map(|_| hub.subscribe()).collect();

        group.throughput(Throughput::Elements(subscribers as u64));

        group.bench_function(format!("fan_out_{}", subscribers), |b| {
            b.iter(|| {
                let report = hub.publish(black_box(update.clone()));
                for subscription in subscriptions.iter_mut() {
                    subscription.try_recv();
                }
                report
            })
        });
    }

    group.finish();
}

fn bench_full_queues(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_saturated");
    let update = Update::from("x".repeat(4096));

    // Nobody drains: every publish after the first 20 hits the drop path
    let hub = Arc::new(Hub::new(HubConfig::default()));
    let _subscriptions: Vec<_> = (0..100).map(|_| hub.subscribe()).collect();

    group.bench_function("drop_newest_100", |b| {
        b.iter(|| hub.publish(black_box(update.clone())))
    });

    group.finish();
}

fn bench_register(c: &mut Criterion) {
    let hub = Arc::new(Hub::new(HubConfig::default()));

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| drop(black_box(hub.subscribe())))
    });
}

criterion_group!(benches, bench_publish, bench_full_queues, bench_register);
criterion_main!(benches);
