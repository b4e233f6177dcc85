// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end sync-primitive scenarios (spec.md §8), driven against a real
//! multi-threaded [`ringcore::Engine`].

use ringcore::sync::{Barrier, Latch};
use ringcore::{Engine, EngineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

fn spin_up(threads: u16) -> Engine {
    let engine = Engine::new(EngineConfig::default().with_threads(threads)).expect("engine");
    engine.start();
    engine
}

/// Barrier of N=5, rounds=1000: five worker tasks each call `arrive_and_wait`
/// 1000 times; the completion callback fires exactly 5000 times.
#[test]
fn barrier_five_workers_thousand_rounds() {
    const WORKERS: usize = 5;
    const ROUNDS: usize = 1000;

    let engine = spin_up(4);
    let handle = engine.handle();

    let barrier = Arc::new(Barrier::new(WORKERS));
    let completions = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    for _ in 0..WORKERS {
        let barrier = barrier.clone();
        let completions = completions.clone();
        let tx = tx.clone();
        handle.spawn_detached(async move {
            for _ in 0..ROUNDS {
                barrier.wait().await;
                completions.fetch_add(1, Ordering::SeqCst);
            }
            let _ = tx.send(());
        });
    }
    drop(tx);

    for _ in 0..WORKERS {
        rx.recv_timeout(Duration::from_secs(10))
            .expect("worker did not finish in time");
    }

    assert_eq!(completions.load(Ordering::SeqCst), WORKERS * ROUNDS);
    engine.stop();
}

/// Latch of K: K concurrent waiters on a latch of K; a single `count_down(K)`
/// releases all of them.
#[test]
fn latch_releases_all_waiters_at_once() {
    const K: isize = 8;

    let engine = spin_up(4);
    let handle = engine.handle();

    let latch = Arc::new(Latch::new(K));
    let released = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    for _ in 0..K {
        let latch = latch.clone();
        let released = released.clone();
        let tx = tx.clone();
        handle.spawn_detached(async move {
            latch.wait().await;
            released.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        });
    }
    drop(tx);

    // Give the waiters a moment to register before releasing the latch.
    std::thread::sleep(Duration::from_millis(50));
    latch.count_down(K);

    for _ in 0..K {
        rx.recv_timeout(Duration::from_secs(5))
            .expect("waiter did not resume in time");
    }

    assert_eq!(released.load(Ordering::SeqCst), K as usize);
    engine.stop();
}

/// Contended mutex: many tasks increment a shared counter through the lock;
/// the final value must equal the number of increments exactly, proving
/// mutual exclusion under real scheduler contention (not just a single
/// poll-driven unit test).
#[test]
fn mutex_serializes_concurrent_increments() {
    const TASKS: usize = 50;
    const INCREMENTS: usize = 200;

    let engine = spin_up(4);
    let handle = engine.handle();

    let mutex = Arc::new(ringcore::sync::Mutex::new(0usize));
    let (tx, rx) = mpsc::channel();

    for _ in 0..TASKS {
        let mutex = mutex.clone();
        let tx = tx.clone();
        handle.spawn_detached(async move {
            for _ in 0..INCREMENTS {
                let mut guard = mutex.lock().await;
                *guard += 1;
            }
            let _ = tx.send(());
        });
    }
    drop(tx);

    for _ in 0..TASKS {
        rx.recv_timeout(Duration::from_secs(10))
            .expect("task did not finish in time");
    }

    assert_eq!(*mutex.try_lock().expect("uncontended by now"), TASKS * INCREMENTS);
    engine.stop();
}
