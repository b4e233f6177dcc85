// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `GeneratorFuture<T>` — a task that can yield `T` multiple times before a
//! final completion (spec.md §4.1, "reusable future/promise").
//!
//! Rust has no stable coroutine syntax, so the yield points are modeled as a
//! rendezvous channel of depth one: the body suspends in
//! [`GeneratorHandle::yield_value`] until the consumer takes the value via
//! [`GeneratorFuture::next`], then the body is resumed to produce the next
//! one. `complete` and `force_complete` close the channel from either side.

use crate::sync::wait_cell::WaitCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

struct Shared<T> {
    slot: spin::Mutex<Option<T>>,
    /// Set once the body will never yield again.
    finished: AtomicBool,
    /// Wakes the body once the consumer has drained `slot`.
    slot_free: WaitCell,
    /// Wakes the consumer once `slot` holds a fresh value or `finished` is set.
    slot_full: WaitCell,
}

/// Handle passed into the generator body, used to yield values back to the
/// consumer.
pub struct GeneratorHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> GeneratorHandle<T> {
    /// Yields `value` to the consumer and suspends until it has been taken.
    pub async fn yield_value(&self, value: T) {
        *self.shared.slot.lock() = Some(value);
        self.shared.slot_full.wake();
        // wait for the consumer to drain the slot before producing the next value.
        loop {
            if self.shared.slot.lock().is_none() {
                return;
            }
            let _ = self.shared.slot_free.wait().await;
        }
    }

    /// Marks the generator as complete. Any further consumer poll observes
    /// the end of the stream.
    pub fn force_complete(&self) {
        self.shared.finished.store(true, Ordering::Release);
        self.shared.slot_full.wake();
    }
}

/// The consumer-facing handle to a generator task.
#[must_use = "generators do nothing unless polled via `next`"]
pub struct GeneratorFuture<T> {
    shared: Arc<Shared<T>>,
    body: Pin<Box<dyn Future<Output = ()> + Send>>,
    body_done: bool,
}

impl<T: Send + 'static> GeneratorFuture<T> {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(GeneratorHandle<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: spin::Mutex::new(None),
            finished: AtomicBool::new(false),
            slot_free: WaitCell::new(),
            slot_full: WaitCell::new(),
        });
        let handle = GeneratorHandle {
            shared: shared.clone(),
        };
        Self {
            shared,
            body: Box::pin(body(handle)),
            body_done: false,
        }
    }

    /// Marks the generator complete from the consumer side, dropping the
    /// body's remaining state without running it further (spec.md §4.1).
    pub fn complete(&mut self) {
        self.shared.finished.store(true, Ordering::Release);
    }

    /// Polls for the next yielded value, or `None` once the generator has
    /// finished.
    pub fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if !self.body_done {
            if self.body.as_mut().poll(cx).is_ready() {
                self.body_done = true;
            }
        }

        if let Some(value) = self.shared.slot.lock().take() {
            self.shared.slot_free.wake();
            return Poll::Ready(Some(value));
        }

        if self.body_done || self.shared.finished.load(Ordering::Acquire) {
            return Poll::Ready(None);
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_then_completes() {
        let mut gen = GeneratorFuture::new(|handle: GeneratorHandle<i32>| async move {
            handle.yield_value(1).await;
            handle.yield_value(2).await;
        });

        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);

        let mut values = Vec::new();
        loop {
            match gen.poll_next(&mut cx) {
                Poll::Ready(Some(v)) => values.push(v),
                Poll::Ready(None) => break,
                Poll::Pending => continue,
            }
        }
        assert_eq!(values, vec![1, 2]);
    }
}
