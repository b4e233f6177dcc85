// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use criterion::{criterion_group, criterion_main, Criterion};
use ringcore::task::TaskBuilder;
use ringcore::{Engine, EngineConfig};
use std::hint::black_box;

async fn work() -> usize {
    let val = 1 + 1;
    ringcore::task::yield_now().await;
    black_box(val)
}

fn single_threaded_spawn(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(1)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("single_threaded_spawn", |b| {
        b.iter(|| {
            let join = TaskBuilder::new()
                .on_thread(ringcore::ThreadId::new(0))
                .spawn(&handle, work());
            assert_eq!(futures::executor::block_on(join).unwrap(), 2);
        });
    });

    engine.stop();
}

fn single_threaded_spawn10(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(1)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("single_threaded_spawn10", |b| {
        b.iter(|| {
            let mut handles = Vec::with_capacity(10);
            for _ in 0..10 {
                let join = TaskBuilder::new()
                    .on_thread(ringcore::ThreadId::new(0))
                    .spawn(&handle, work());
                handles.push(join);
            }
            for join in handles {
                assert_eq!(futures::executor::block_on(join).unwrap(), 2);
            }
        });
    });

    engine.stop();
}

fn multi_threaded_spawn(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig::default().with_threads(4)).unwrap();
    engine.start();
    let handle = engine.handle();

    c.bench_function("multi_threaded_spawn", |b| {
        b.iter(|| {
            let join = TaskBuilder::new().spawn(&handle, work());
            assert_eq!(futures::executor::block_on(join).unwrap(), 2);
        });
    });

    engine.stop();
}

criterion_group!(
    spawn,
    single_threaded_spawn,
    single_threaded_spawn10,
    multi_threaded_spawn,
);
criterion_main!(spawn);
