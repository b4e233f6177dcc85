// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The `pause`/`unpause` bridge every I/O primitive, timer, and synchronization
//! type suspends through (spec §4.1, §5).
//!
//! The original defines a `pause_pack` of `{thread, scratch, coroutine_handle}`
//! that producers touch through a raw pointer. Rust already gives us an
//! address-stable, reference-counted handle to "the thing to resume" in
//! [`std::task::Waker`], so the pack here is an `Arc`-shared cell rather than
//! a bare pointer — the tagged-pointer encoding the original used is called
//! out in its own design notes as an optimization, not a contract.

use crate::types::{Order, ThreadId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Sentinel written into [`PausePack::scratch`] when a ring submission could
/// not be queued (spec §7, item 2).
pub const SUBMIT_FAILED: i32 = -1;

/// Sentinel floor: any scratch value `<= CANCELLED` means the pack was
/// resumed via cancellation rather than a normal completion (spec §7, item 3).
pub const CANCELLED: i32 = i32::MIN + 1;

/// A snapshot of a pause pack's result, returned from `await`ing a [`Pause`].
#[derive(Debug, Clone, Copy)]
pub struct PausePack {
    pub thread: ThreadId,
    pub scratch: i32,
}

impl PausePack {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.scratch <= CANCELLED
    }
}

#[derive(Debug)]
struct Inner {
    thread: ThreadId,
    scratch: i32,
    waker: Option<Waker>,
    done: bool,
}

/// The shared cell a producer (I/O ring, timer, primitive) holds onto after a
/// task suspends through [`pause`]. Cloning is cheap; only one producer may
/// ever successfully complete a given cell (see [`PauseCell::complete`]).
#[derive(Clone, Debug)]
pub struct PauseCell(Arc<spin::Mutex<Inner>>);

impl PauseCell {
    fn new() -> Self {
        Self(Arc::new(spin::Mutex::new(Inner {
            thread: ThreadId::ANY,
            scratch: 0,
            waker: None,
            done: false,
        })))
    }

    /// Completes the pack with `scratch` and wakes the waiting task, if any.
    ///
    /// A pack may be completed exactly once; later calls are no-ops, matching
    /// the "exactly-once completion" invariant (spec §8).
    pub fn complete(&self, scratch: i32) {
        let waker = {
            let mut inner = self.0.lock();
            if inner.done {
                return;
            }
            inner.done = true;
            inner.scratch = scratch;
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Attempts to claim this cell for cancellation. Returns `true` if the
    /// pack was still pending and is now completed with the cancel sentinel;
    /// `false` if a completion had already landed (spec §4.1, cancellation).
    pub fn try_cancel(&self, code: i32) -> bool {
        let waker = {
            let mut inner = self.0.lock();
            if inner.done {
                return false;
            }
            inner.done = true;
            inner.scratch = CANCELLED.saturating_sub(code.abs());
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.0.lock().done
    }

    fn set_waker(&self, thread: ThreadId, waker: Waker) -> Option<PausePack> {
        let mut inner = self.0.lock();
        if inner.done {
            return Some(PausePack {
                thread: inner.thread,
                scratch: inner.scratch,
            });
        }
        inner.thread = thread;
        inner.waker = Some(waker);
        None
    }
}

/// The awaitable returned by [`pause`].
#[must_use = "futures do nothing unless polled"]
pub struct Pause<F> {
    func: Option<F>,
    cell: PauseCell,
    thread: ThreadId,
}

impl<F> Future for Pause<F>
where
    F: FnOnce(PauseCell) + Send,
{
    type Output = PausePack;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<PausePack> {
        // Safety: `func` is only ever taken here and `Pause` has no other
        // pinned structural fields that require projection.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(ready) = this.cell.set_waker(this.thread, cx.waker().clone()) {
            return Poll::Ready(ready);
        }

        if let Some(func) = this.func.take() {
            func(this.cell.clone());
        }

        Poll::Pending
    }
}

/// Suspends the current task, handing `func` a [`PauseCell`] it (or some
/// other thread) will later call [`PauseCell::complete`] on.
///
/// This is the sole bridge I/O, timers, and synchronization primitives use to
/// pin a waiter (spec §4.1).
pub fn pause<F>(func: F) -> Pause<F>
where
    F: FnOnce(PauseCell) + Send,
{
    Pause {
        func: Some(func),
        cell: PauseCell::new(),
        thread: ThreadId::ANY,
    }
}

/// Resumes a previously paused continuation through the given scheduling
/// order. Currently this only supports `Order::NOW`-style immediate wakeups;
/// delayed resumption is composed by callers via the timer service.
pub fn unpause(cell: &PauseCell, order: Order, scratch: i32) {
    debug_assert!(order.is_now(), "delayed unpause must route through the timer service");
    cell.complete(scratch);
}
