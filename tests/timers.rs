// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end timer service scenarios, grounded on `timer_service.hpp`'s
//! deadline map: registration, in-order firing, and the parked-worker
//! wakeup path (spec.md §9's "reproduce the backoff curve exactly" note
//! depends on timers actually firing while a worker is otherwise idle).

use ringcore::types::{Order, ThreadId};
use ringcore::{Engine, EngineConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn spin_up(threads: u16) -> Engine {
    let engine = Engine::new(EngineConfig::default().with_threads(threads)).expect("engine");
    engine.start();
    engine
}

/// A single timer registered on an otherwise-idle worker still fires: this
/// is the scenario that requires a worker's `park()` to be bounded by the
/// earliest pending deadline rather than blocking forever on the ring.
#[test]
fn single_timer_fires_on_idle_worker() {
    let engine = spin_up(1);
    let handle = engine.handle();
    let thread = ThreadId::new(0);

    let (tx, rx) = mpsc::channel();
    let started = Instant::now();
    handle.spawn_detached(async move {
        let _ = tx.send(());
    });
    // Drain the trivial warmup task first so the worker parks before the
    // real timer below is registered.
    rx.recv_timeout(Duration::from_secs(5)).expect("warmup task ran");

    let (tx, rx) = mpsc::channel();
    let deadline = Order::in_milli(200);
    handle.timer(thread).register(deadline, ringcore_test_waker(tx));

    rx.recv_timeout(Duration::from_secs(5))
        .expect("timer did not fire while worker was idle");
    assert!(started.elapsed() >= Duration::from_millis(200));

    engine.stop();
}

/// Deadlines registered out of order still fire in deadline order.
#[test]
fn timers_fire_in_deadline_order() {
    let engine = spin_up(1);
    let handle = engine.handle();
    let thread = ThreadId::new(0);

    let order = Arc::new(spin::Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();

    for (label, millis) in [(3, 300), (1, 100), (2, 200)] {
        let order = order.clone();
        let tx = tx.clone();
        let deadline = Order::in_milli(millis);
        handle.timer(thread).register(
            deadline,
            ringcore_test_waker_with(move || {
                order.lock().push(label);
            }),
        );
        let _ = tx.send(());
    }
    drop(tx);
    for _ in 0..3 {
        let _ = rx.recv_timeout(Duration::from_secs(1));
    }

    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(*order.lock(), vec![1, 2, 3]);

    engine.stop();
}

/// Minimal `Wake` adapter used by these tests: sends on a channel instead of
/// rescheduling a task, since the test only needs to observe *that* the
/// timer fired, not to resume a suspended future.
fn ringcore_test_waker(tx: mpsc::Sender<()>) -> std::task::Waker {
    ringcore_test_waker_with(move || {
        let _ = tx.send(());
    })
}

fn ringcore_test_waker_with<F: Fn() + Send + Sync + 'static>(f: F) -> std::task::Waker {
    struct FnWake<F>(F);
    impl<F: Fn() + Send + Sync + 'static> std::task::Wake for FnWake<F> {
        fn wake(self: Arc<Self>) {
            (self.0)();
        }
        fn wake_by_ref(self: &Arc<Self>) {
            (self.0)();
        }
    }
    std::task::Waker::from(Arc::new(FnWake(f)))
}
