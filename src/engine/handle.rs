// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The thin per-object engine handle (spec.md's supplemented features,
//! grounded on `engine_enabled.hpp`): every engine-attached object needs a
//! way back to its event loop, timer, and scheduler. The original gives
//! that to every such object via a CRTP base class it inherits from; Rust
//! composes instead of inheriting, so `Handle` is a small `Clone`-able
//! struct each primitive's constructor takes by reference or by value, the
//! same way `libs/kasync`'s primitives take `&'static Executor`.

use super::EngineInner;
use crate::io::EventLoop;
use crate::signal::SignalDispatch;
use crate::task::BoxedTask;
use crate::time::TimerService;
use crate::types::{Order, ThreadId};
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct Handle {
    pub(super) inner: Arc<EngineInner>,
}

impl Handle {
    #[must_use]
    pub fn current_id(&self) -> ThreadId {
        super::current_thread()
    }

    #[must_use]
    pub fn event_loop(&self, thread: ThreadId) -> &EventLoop {
        &self.inner.event_loops[thread.index()]
    }

    #[must_use]
    pub fn timer(&self, thread: ThreadId) -> &TimerService {
        &self.inner.timers[thread.index()]
    }

    #[must_use]
    pub fn number_of_workers(&self) -> usize {
        self.inner.event_loops.len()
    }

    /// The process-wide signal dispatcher bound to this engine, equivalent to
    /// `engine_->get_signal_handler()`.
    #[must_use]
    pub fn signal_handler(&self) -> &SignalDispatch {
        &self.inner.signals
    }

    /// Spawns a detached, unobserved task (spec.md §4.1).
    pub fn spawn_detached<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.scheduler.spawn(ThreadId::ANY, future);
    }

    /// Spawns a detached, unobserved task pinned to `thread`.
    pub fn spawn_detached_on<F>(&self, thread: ThreadId, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.scheduler.spawn(thread, future);
    }

    pub(crate) fn spawn_boxed(&self, thread: ThreadId, task: BoxedTask) {
        self.inner.scheduler.spawn_boxed(thread, task);
    }

    /// Resumes `waker` as soon as possible, on any worker.
    pub fn resume(&self, waker: std::task::Waker) {
        waker.wake();
    }

    /// Resumes `waker` as soon as possible, pinned to `thread`.
    ///
    /// Implemented by re-spawning a trivial task on that worker whose sole
    /// job is to invoke the waker, since a bare `Waker` carries no thread
    /// affinity of its own.
    pub fn thread_resume(&self, waker: std::task::Waker, thread: ThreadId) {
        self.inner.scheduler.spawn(
            thread,
            async move {
                waker.wake();
            },
        );
    }

    /// Resumes `waker` once `order` has passed.
    pub fn delayed_resume(&self, waker: std::task::Waker, order: Order, thread: ThreadId) {
        let timer = self.timer(if thread.is_any() {
            self.current_id()
        } else {
            thread
        });
        timer.register(order, waker);
    }
}
