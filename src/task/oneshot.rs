// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `OneShotFuture<T>` — a task flavor that produces exactly one value and is
//! observed by exactly one awaiter (spec.md §4.1, "simple future").
//!
//! Rust futures already begin executing on first poll and tear down their
//! state on drop once ready, which is the entirety of what the original's
//! `simple_future`/`simple_promise` pair provides beyond a bare boxed future.
//! This type exists as a named, documented wrapper rather than exposing
//! `Pin<Box<dyn Future<...>>>` directly at call sites.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A boxed, single-consumer future. Begins running the first time it is
/// polled; its state is dropped as soon as it resolves.
#[must_use = "futures do nothing unless polled"]
pub struct OneShotFuture<T> {
    inner: Pin<Box<dyn Future<Output = T> + Send>>,
}

impl<T> OneShotFuture<T> {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: Box::pin(fut),
        }
    }
}

impl<T> Future for OneShotFuture<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.inner.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_with_inner_value() {
        let fut = OneShotFuture::new(async { 7 });
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = Box::pin(fut);
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(7));
    }
}
