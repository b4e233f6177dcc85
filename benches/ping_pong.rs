// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use criterion::{criterion_group, criterion_main, Criterion};
use ringcore::task::{yield_now, TaskBuilder};
use ringcore::{Engine, EngineConfig};

const PINGS: usize = 10_000;

async fn ping() {
    for _ in 0..PINGS {
        yield_now().await;
    }
}

fn ping_ping_10k_single_threaded(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(1)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("ping_ping_10k_single_threaded", |b| {
        b.iter(|| {
            let h = TaskBuilder::new()
                .on_thread(ringcore::ThreadId::new(0))
                .spawn(&handle, ping());
            futures::executor::block_on(h).unwrap();
        });
    });

    engine.stop();
}

fn ping_pong_10k_single_threaded(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(1)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("ping_pong_10k_single_threaded", |b| {
        b.iter(|| {
            let h1 = TaskBuilder::new()
                .on_thread(ringcore::ThreadId::new(0))
                .spawn(&handle, ping());
            let h2 = TaskBuilder::new()
                .on_thread(ringcore::ThreadId::new(0))
                .spawn(&handle, ping());
            futures::executor::block_on(futures::future::try_join(h1, h2)).unwrap();
        });
    });

    engine.stop();
}

fn ping_ping_10k_multi_threaded(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(2)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("ping_ping_10k_multi_threaded", |b| {
        b.iter(|| {
            let h = TaskBuilder::new().spawn(&handle, ping());
            futures::executor::block_on(h).unwrap();
        });
    });

    engine.stop();
}

fn ping_pong_10k_multi_threaded(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(2)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("ping_pong_10k_multi_threaded", |b| {
        b.iter(|| {
            let h1 = TaskBuilder::new().spawn(&handle, ping());
            let h2 = TaskBuilder::new().spawn(&handle, ping());
            futures::executor::block_on(futures::future::try_join(h1, h2)).unwrap();
        });
    });

    engine.stop();
}

criterion_group!(
    ping_pong,
    ping_ping_10k_single_threaded,
    ping_pong_10k_single_threaded,
    ping_ping_10k_multi_threaded,
    ping_pong_10k_multi_threaded,
);
criterion_main!(ping_pong);
