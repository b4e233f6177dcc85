// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The work-stealing multi-threaded scheduler (spec.md §4.2, C4), grounded
//! on `async-exec`'s `Executor`/`Worker`: each worker drains its own run
//! queue first, falls back to stealing from a sibling, and finally drains
//! the global injector before parking.
//!
//! `async-exec` represents a schedulable unit as an intrusive, vtable-erased
//! `TaskRef` pushed through a lock-free MPSC queue (`mpsc_queue::MpscQueue`).
//! That buys allocation-free rescheduling at the cost of a large amount of
//! `unsafe`. Here a task is an `Arc<TaskCell>` implementing `std::task::Wake`
//! that re-enqueues itself through a `spin::Mutex`-guarded deque — the same
//! "queue per worker plus a global injector, steal when your own queue runs
//! dry" shape, built from safe primitives.

use crate::task::BoxedTask;
use crate::types::ThreadId;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::Thread;

struct TaskCell {
    future: spin::Mutex<Option<BoxedTask>>,
    scheduler: Weak<Inner>,
    home: ThreadId,
}

impl Wake for TaskCell {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if let Some(inner) = self.scheduler.upgrade() {
            tracing::trace!(home = ?self.home, "waking task");
            inner.enqueue(self.clone());
        }
    }
}

struct WorkerQueue {
    tasks: spin::Mutex<VecDeque<Arc<TaskCell>>>,
    thread: spin::Mutex<Option<Thread>>,
}

impl WorkerQueue {
    fn new() -> Self {
        Self {
            tasks: spin::Mutex::new(VecDeque::new()),
            thread: spin::Mutex::new(None),
        }
    }
}

struct Inner {
    workers: Vec<WorkerQueue>,
    injector: spin::Mutex<VecDeque<Arc<TaskCell>>>,
    stopped: AtomicBool,
}

impl Inner {
    fn enqueue(&self, cell: Arc<TaskCell>) {
        let thread_to_unpark;
        if cell.home.is_any() {
            self.injector.lock().push_back(cell);
            thread_to_unpark = self.workers.iter().find_map(|w| w.thread.lock().clone());
        } else {
            let idx = cell.home.index();
            let worker = &self.workers[idx];
            worker.tasks.lock().push_back(cell);
            thread_to_unpark = worker.thread.lock().clone();
        }
        if let Some(thread) = thread_to_unpark {
            thread.unpark();
        }
    }
}

/// Owns the per-worker run queues and the global injector.
#[derive(Clone)]
pub(crate) struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                workers: (0..workers).map(|_| WorkerQueue::new()).collect(),
                injector: spin::Mutex::new(VecDeque::new()),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.inner.workers.len()
    }

    pub(crate) fn register_thread(&self, worker: ThreadId) {
        *self.inner.workers[worker.index()].thread.lock() = Some(std::thread::current());
    }

    pub(crate) fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        for worker in &self.inner.workers {
            if let Some(thread) = worker.thread.lock().clone() {
                thread.unpark();
            }
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Schedules `future` onto `home` (or any worker, if `home` is `ANY`).
    pub(crate) fn spawn<F>(&self, home: ThreadId, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cell = Arc::new(TaskCell {
            future: spin::Mutex::new(Some(Box::pin(future))),
            scheduler: Arc::downgrade(&self.inner),
            home,
        });
        self.inner.enqueue(cell);
    }

    pub(crate) fn spawn_boxed(&self, home: ThreadId, future: BoxedTask) {
        let cell = Arc::new(TaskCell {
            future: spin::Mutex::new(Some(future)),
            scheduler: Arc::downgrade(&self.inner),
            home,
        });
        self.inner.enqueue(cell);
    }

    /// Polls up to `n` tasks belonging to `worker`, stealing from siblings
    /// and the injector when its own queue is empty. Returns the number of
    /// tasks polled.
    pub(crate) fn tick(&self, worker: ThreadId, n: usize) -> usize {
        let idx = worker.index();
        let mut polled = 0;
        for _ in 0..n {
            let Some(cell) = self.next_for(idx) else {
                break;
            };
            self.poll_one(cell);
            polled += 1;
        }
        polled
    }

    fn next_for(&self, idx: usize) -> Option<Arc<TaskCell>> {
        if let Some(cell) = self.inner.workers[idx].tasks.lock().pop_front() {
            return Some(cell);
        }
        if let Some(cell) = self.inner.injector.lock().pop_front() {
            return Some(cell);
        }
        let worker_count = self.inner.workers.len();
        if worker_count <= 1 {
            return None;
        }
        let start = fastrand::usize(1..worker_count);
        for offset in 0..worker_count - 1 {
            let victim = (idx + start + offset) % worker_count;
            if victim == idx {
                continue;
            }
            let stolen = self.inner.workers[victim].tasks.lock().pop_back();
            if stolen.is_some() {
                tracing::trace!(?idx, ?victim, "stole task from sibling");
                return stolen;
            }
        }
        None
    }

    fn poll_one(&self, cell: Arc<TaskCell>) {
        let mut future = match cell.future.lock().take() {
            Some(future) => future,
            None => return,
        };
        let waker = Waker::from(cell.clone());
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                tracing::trace!(home = ?cell.home, "task completed");
            }
            Poll::Pending => {
                *cell.future.lock() = Some(future);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn spawned_task_runs_to_completion() {
        let scheduler = Scheduler::new(1);
        scheduler.register_thread(ThreadId::new(0));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        scheduler.spawn(ThreadId::new(0), async move {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.tick(ThreadId::new(0), 8);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stealing_picks_up_sibling_work() {
        let scheduler = Scheduler::new(2);
        scheduler.register_thread(ThreadId::new(0));
        scheduler.register_thread(ThreadId::new(1));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        scheduler.spawn(ThreadId::new(0), async move {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.tick(ThreadId::new(1), 8);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
