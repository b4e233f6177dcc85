// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `VisitorFuture<T>` — a [`OneShotFuture`](super::oneshot::OneShotFuture)
//! whose body may register deferred callbacks that run, in LIFO order, on
//! the final result before the awaiter observes it (spec.md §4.1, "visitor
//! promise").
//!
//! The original exposes this through the coroutine's promise type, which the
//! body reaches via `co_await`. Rust has no ambient access to "my own task's
//! promise" from inside an `async fn`, so the capability is passed explicitly
//! as a [`VisitorHandle`] argument instead.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

type Deferred<T> = Box<dyn FnOnce(&mut T) + Send>;

struct Shared<T> {
    chain: spin::Mutex<Vec<Deferred<T>>>,
}

/// Handle passed into a visitor task body, used to register or clear
/// deferred callbacks.
pub struct VisitorHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for VisitorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> VisitorHandle<T> {
    /// Pushes a callback to the front of the deferred chain; it will run
    /// before callbacks registered earlier.
    pub fn yield_deferred<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.shared.chain.lock().insert(0, Box::new(f));
    }

    /// Clears every deferred callback registered so far.
    pub fn yield_purge(&self) {
        self.shared.chain.lock().clear();
    }
}

/// A one-shot future whose result passes through a chain of deferred
/// callbacks before the awaiter observes it.
#[must_use = "futures do nothing unless polled"]
pub struct VisitorFuture<T> {
    shared: Arc<Shared<T>>,
    inner: Pin<Box<dyn Future<Output = T> + Send>>,
}

impl<T: Send + 'static> VisitorFuture<T> {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(VisitorHandle<T>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            chain: spin::Mutex::new(Vec::new()),
        });
        let handle = VisitorHandle {
            shared: shared.clone(),
        };
        Self {
            shared,
            inner: Box::pin(body(handle)),
        }
    }
}

impl<T: Send + 'static> Future for VisitorFuture<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut value = match self.inner.as_mut().poll(cx) {
            Poll::Ready(value) => value,
            Poll::Pending => return Poll::Pending,
        };
        let chain = std::mem::take(&mut *self.shared.chain.lock());
        for callback in chain {
            callback(&mut value);
        }
        Poll::Ready(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_chain_runs_in_lifo_order() {
        let fut = VisitorFuture::new(|handle: VisitorHandle<Vec<i32>>| async move {
            handle.yield_deferred(|v: &mut Vec<i32>| v.push(1));
            handle.yield_deferred(|v: &mut Vec<i32>| v.push(2));
            Vec::new()
        });

        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = Box::pin(fut);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(v) => assert_eq!(v, vec![2, 1]),
            Poll::Pending => panic!("expected immediate completion"),
        }
    }
}
