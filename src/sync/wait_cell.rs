// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A single-waiter registered [`Waker`] cell, the building block the
//! generator/visitor task flavors and the observable primitive rendezvous
//! through.

use crate::error::Closed;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

struct Inner {
    waker: Option<Waker>,
    woken: bool,
    closed: bool,
}

/// Holds at most one task's [`Waker`] at a time. [`wake`](WaitCell::wake)
/// fires it; [`wait`](WaitCell::wait) registers the current task's waker and
/// suspends until woken or closed.
pub struct WaitCell {
    inner: spin::Mutex<Inner>,
}

impl WaitCell {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: spin::Mutex::new(Inner {
                waker: None,
                woken: false,
                closed: false,
            }),
        }
    }

    /// Registers interest and returns a future that resolves once woken.
    #[must_use]
    pub fn wait(&self) -> Wait<'_> {
        Wait { cell: self }
    }

    /// Wakes the currently registered waiter, if any.
    ///
    /// Returns `true` if a waiter was woken.
    pub fn wake(&self) -> bool {
        let waker = {
            let mut inner = self.inner.lock();
            inner.woken = true;
            inner.waker.take()
        };
        let woke = waker.is_some();
        if let Some(waker) = waker {
            waker.wake();
        }
        woke
    }

    /// Closes the cell, waking any waiter with [`Closed`].
    pub fn close(&self) {
        let waker = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    fn poll_wait(&self, cx: &mut Context<'_>) -> Poll<Result<(), Closed>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Poll::Ready(Err(Closed));
        }
        if inner.woken {
            inner.woken = false;
            return Poll::Ready(Ok(()));
        }
        inner.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Default for WaitCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WaitCell")
            .field("woken", &inner.woken)
            .field("closed", &inner.closed)
            .finish()
    }
}

impl Drop for WaitCell {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lets an `Arc<WaitCell>` stand in as a plain `std::task::Waker`, e.g. to
/// hand a timer service something to call back into without going through a
/// polled future's own waker.
impl std::task::Wake for WaitCell {
    fn wake(self: std::sync::Arc<Self>) {
        WaitCell::wake(&self);
    }

    fn wake_by_ref(self: &std::sync::Arc<Self>) {
        WaitCell::wake(self);
    }
}

/// Future returned by [`WaitCell::wait`].
#[must_use = "futures do nothing unless polled"]
pub struct Wait<'a> {
    cell: &'a WaitCell,
}

impl Future for Wait<'_> {
    type Output = Result<(), Closed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.cell.poll_wait(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_before_poll_is_observed() {
        let cell = WaitCell::new();
        assert!(!cell.wake()); // nobody waiting yet, still records `woken`
        let waker = futures_noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut wait = Box::pin(cell.wait());
        assert!(matches!(wait.as_mut().poll(&mut cx), Poll::Ready(Ok(()))));
    }

    #[test]
    fn close_wakes_with_error() {
        let cell = WaitCell::new();
        cell.close();
        let waker = futures_noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut wait = Box::pin(cell.wait());
        assert!(matches!(wait.as_mut().poll(&mut cx), Poll::Ready(Err(Closed))));
    }

    fn futures_noop_waker() -> Waker {
        use std::task::{RawWaker, RawWakerVTable};
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        fn noop(_: *const ()) {}
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
    }
}
