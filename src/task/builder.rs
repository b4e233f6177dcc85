// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Builder for spawning named, located tasks onto the engine (spec.md §4.1).
//!
//! Grounded on `async-exec`'s `task::builder::TaskBuilder`: same `name`/
//! `kind`/`location` knobs and `#[track_caller]` default, minus the
//! generic-scheduler and custom-allocator parameters this crate has no use
//! for (there is exactly one scheduler).

use crate::engine::Handle;
use crate::error::Closed;
use crate::sync::wait_cell::WaitCell;
use crate::types::ThreadId;
use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug)]
pub struct TaskBuilder<'a> {
    location: Option<Location<'a>>,
    name: Option<&'a str>,
    kind: &'a str,
    thread: ThreadId,
}

impl<'a> Default for TaskBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TaskBuilder<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            location: None,
            name: None,
            kind: "task",
            thread: ThreadId::ANY,
        }
    }

    /// Overrides the name used in tracing spans for tasks from this builder.
    #[must_use]
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Overrides the `kind` string shown in tracing spans.
    #[must_use]
    pub fn kind(mut self, kind: &'a str) -> Self {
        self.kind = kind;
        self
    }

    /// Overrides the source location attributed to the task.
    #[must_use]
    pub fn location(mut self, location: Location<'a>) -> Self {
        self.location = Some(location);
        self
    }

    /// Pins the task to a specific worker thread rather than `ThreadId::ANY`.
    #[must_use]
    pub fn on_thread(mut self, thread: ThreadId) -> Self {
        self.thread = thread;
        self
    }

    /// Builds and schedules the task onto `handle`, honoring
    /// [`TaskBuilder::on_thread`], and returns a [`JoinHandle`] observing its
    /// output.
    #[track_caller]
    pub fn spawn<F>(&self, handle: &Handle, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (task, join) = self.build(future);
        handle.spawn_boxed(self.thread, task);
        join
    }

    /// Builds the task, returning the boxed future to schedule and a
    /// [`JoinHandle`] observing its output.
    #[track_caller]
    pub(crate) fn build<F>(&self, future: F) -> (super::BoxedTask, JoinHandle<F::Output>)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let loc = self.location.unwrap_or(*Location::caller());
        let span = tracing::trace_span!(
            "task",
            task.name = ?self.name,
            task.kind = self.kind,
            task.thread = ?self.thread,
            loc.file = loc.file(),
            loc.line = loc.line(),
            loc.col = loc.column(),
        );

        let shared = Arc::new(Shared {
            slot: spin::Mutex::new(None),
            done: WaitCell::new(),
            aborted: AtomicBool::new(false),
        });
        let join_shared = shared.clone();

        let boxed = super::boxed(async move {
            let _entered = span.enter();
            if shared.aborted.load(Ordering::Acquire) {
                return;
            }
            let output = future.await;
            *shared.slot.lock() = Some(output);
            shared.done.wake();
        });

        (boxed, JoinHandle { shared: join_shared })
    }
}

struct Shared<T> {
    slot: spin::Mutex<Option<T>>,
    done: WaitCell,
    aborted: AtomicBool,
}

/// A handle to a spawned task's eventual output.
#[must_use = "futures do nothing unless polled"]
pub struct JoinHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> JoinHandle<T> {
    /// Requests cancellation. If the task has not yet started running its
    /// body, it never will; if it is already running, cancellation takes
    /// effect the next time it would otherwise have produced output.
    pub fn abort(&self) {
        self.shared.aborted.store(true, Ordering::Release);
        self.shared.done.wake();
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T, Closed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(value) = self.shared.slot.lock().take() {
            return Poll::Ready(Ok(value));
        }
        if self.shared.aborted.load(Ordering::Acquire) {
            return Poll::Ready(Err(Closed));
        }
        let wait = self.shared.done.wait();
        let mut wait = Box::pin(wait);
        match wait.as_mut().poll(cx) {
            Poll::Ready(_) => {
                if let Some(value) = self.shared.slot.lock().take() {
                    Poll::Ready(Ok(value))
                } else {
                    Poll::Ready(Err(Closed))
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handle_observes_output() {
        let (mut task, mut handle) = TaskBuilder::new().name("t").build(async { 5 });
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        assert_eq!(task.as_mut().poll(&mut cx), Poll::Ready(()));
        match Pin::new(&mut handle).poll(&mut cx) {
            Poll::Ready(Ok(v)) => assert_eq!(v, 5),
            other => panic!("unexpected {other:?}"),
        }
    }
}
