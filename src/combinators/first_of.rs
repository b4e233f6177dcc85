// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `first_of` (spec.md §4.6, grounded on `first_of.hpp`): races several
//! futures and returns the first to complete.
//!
//! Each branch is spawned as its own detached task on the [`Handle`] rather
//! than polled inline, and losing branches are never cancelled or dropped —
//! they keep running to completion in the background, same as the original
//! (which only ever tears down the `pause_pack` the loser would have used to
//! resume, not the coroutine frame itself). Their eventual results are
//! simply discarded once the race is decided.

use crate::engine::Handle;
use crate::sync::wait_cell::WaitCell;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The result of a two-way race: which branch arrived first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<A, B> {
    First(A),
    Second(B),
}

struct Shared<T> {
    slot: spin::Mutex<Option<T>>,
    decided: AtomicBool,
    cell: WaitCell,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            slot: spin::Mutex::new(None),
            decided: AtomicBool::new(false),
            cell: WaitCell::new(),
        }
    }

    fn try_win(&self, value: T) {
        if self.decided.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.slot.lock() = Some(value);
        self.cell.wake();
    }
}

/// Races two heterogeneous futures, returning whichever completes first.
pub async fn first_of2<A, B>(handle: &Handle, a: A, b: B) -> Either<A::Output, B::Output>
where
    A: Future + Send + 'static,
    A::Output: Send + 'static,
    B: Future + Send + 'static,
    B::Output: Send + 'static,
{
    let shared = Arc::new(Shared::new());

    let first = shared.clone();
    handle.spawn_detached(async move {
        let value = a.await;
        first.try_win(Either::First(value));
    });

    let second = shared.clone();
    handle.spawn_detached(async move {
        let value = b.await;
        second.try_win(Either::Second(value));
    });

    loop {
        if let Some(value) = shared.slot.lock().take() {
            return value;
        }
        let _ = shared.cell.wait().await;
    }
}

/// Races a homogeneous collection of futures, returning the first result and
/// discarding the rest (which keep running in the background).
pub async fn first_of<T>(
    handle: &Handle,
    futures: Vec<std::pin::Pin<Box<dyn Future<Output = T> + Send>>>,
) -> T
where
    T: Send + 'static,
{
    let shared = Arc::new(Shared::new());

    for future in futures {
        let branch = shared.clone();
        handle.spawn_detached(async move {
            let value = future.await;
            branch.try_win(value);
        });
    }

    loop {
        if let Some(value) = shared.slot.lock().take() {
            return value;
        }
        let _ = shared.cell.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_only_records_the_first_winner() {
        let shared = Shared::new();
        shared.try_win(1);
        shared.try_win(2);
        assert_eq!(*shared.slot.lock(), Some(1));
    }
}
