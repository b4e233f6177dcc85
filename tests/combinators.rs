// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end combinator scenarios (spec.md §8).

use ringcore::combinators::{first_of2, for_each, wait_all, wait_two, Either, ForCtl};
use ringcore::engine::Handle;
use ringcore::task::{GeneratorFuture, GeneratorHandle};
use ringcore::types::{Order, ThreadId};
use ringcore::{Engine, EngineConfig};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// A future that resolves once `deadline` has passed, driven through the
/// engine's own [`ringcore::engine::Handle::delayed_resume`] — the same
/// timer path every real suspension in this crate goes through.
struct Sleep {
    handle: Handle,
    thread: ThreadId,
    deadline: Order,
    registered: bool,
}

impl Sleep {
    fn for_millis(handle: Handle, thread: ThreadId, millis: i64) -> Self {
        Self {
            handle,
            thread,
            deadline: Order::in_milli(millis),
            registered: false,
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if Order::now() >= self.deadline {
            return Poll::Ready(());
        }
        if !self.registered {
            self.registered = true;
            self.handle
                .delayed_resume(cx.waker().clone(), self.deadline, self.thread);
        }
        Poll::Pending
    }
}

fn spin_up(threads: u16) -> Engine {
    let engine = Engine::new(EngineConfig::default().with_threads(threads)).expect("engine");
    engine.start();
    engine
}

/// `wait_for(mixed)`: four branches of different output types complete
/// together; each branch's own counter lands at exactly the literal value
/// it counted up to.
#[test]
fn wait_all_combines_mixed_counters() {
    const L: usize = 12;

    async fn count_to(target: usize, counter: Arc<AtomicUsize>) -> usize {
        for _ in 0..target {
            counter.fetch_add(1, Ordering::SeqCst);
            ringcore::task::yield_now().await;
        }
        counter.load(Ordering::SeqCst)
    }

    let counters: Vec<_> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let targets = [L / 4, L * 2, L - 1, L / 3];

    let futures: Vec<Pin<Box<dyn Future<Output = usize> + Send>>> = targets
        .iter()
        .zip(counters.iter())
        .map(|(&target, counter)| {
            let counter = counter.clone();
            Box::pin(count_to(target, counter)) as Pin<Box<dyn Future<Output = usize> + Send>>
        })
        .collect();

    let results = futures::executor::block_on(wait_all(futures));
    assert_eq!(results, targets.to_vec());
    for (counter, &target) in counters.iter().zip(targets.iter()) {
        assert_eq!(counter.load(Ordering::SeqCst), target);
    }
}

#[test]
fn wait_two_joins_heterogeneous_branches() {
    let (count, label) = futures::executor::block_on(wait_two(
        async { 41 + 1 },
        async { "joined" },
    ));
    assert_eq!(count, 42);
    assert_eq!(label, "joined");
}

/// `first_of(2s, 1s, 3s)`: the 1-second branch wins, and the aggregate
/// completes in at least one second but under two.
#[test]
fn first_of_returns_fastest_branch_within_window() {
    let engine = spin_up(4);
    let handle = engine.handle();
    let thread = ThreadId::new(0);

    let started = Instant::now();
    let winner = futures::executor::block_on(first_of2(
        &handle,
        Sleep::for_millis(handle.clone(), thread, 2_000),
        Sleep::for_millis(handle.clone(), thread, 1_000),
    ));
    let elapsed = started.elapsed();

    assert_eq!(winner, Either::Second(()));
    assert!(elapsed >= Duration::from_millis(1_000));
    assert!(elapsed < Duration::from_millis(2_000));

    engine.stop();
}

/// A losing `first_of` branch is never cancelled: its side effect still
/// lands after the race has already returned a winner.
#[test]
fn first_of_loser_side_effects_land_after_race_returns() {
    let engine = spin_up(4);
    let handle = engine.handle();
    let thread = ThreadId::new(0);

    let loser_ran = Arc::new(AtomicUsize::new(0));
    let loser_ran_clone = loser_ran.clone();
    let handle_for_loser = handle.clone();

    let winner = futures::executor::block_on(first_of2(
        &handle,
        async { 1 },
        async move {
            Sleep::for_millis(handle_for_loser, thread, 100).await;
            loser_ran_clone.fetch_add(1, Ordering::SeqCst);
        },
    ));
    assert_eq!(winner, Either::First(1));
    assert_eq!(loser_ran.load(Ordering::SeqCst), 0, "loser hasn't run yet");

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(loser_ran.load(Ordering::SeqCst), 1, "loser still completed in the background");

    engine.stop();
}

#[test]
fn for_each_drains_generator_to_completion() {
    let generator = GeneratorFuture::new(|handle: GeneratorHandle<i32>| async move {
        for value in 1..=5 {
            handle.yield_value(value).await;
        }
    });

    let seen = Arc::new(spin::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let driven = for_each(generator, move |value: i32| {
        let seen = seen_clone.clone();
        async move {
            seen.lock().push(value);
            ForCtl::Continue
        }
    });

    futures::executor::block_on(driven);
    assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
}
