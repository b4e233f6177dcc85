// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The engine: thread pool lifecycle and routing primitives (spec.md §4.4,
//! C8), grounded on `engine.hpp`/`engine.cpp`.

pub mod config;
mod handle;

pub use config::{EngineConfig, ThreadPolicy};
pub use handle::Handle;

use crate::error::RingError;
use crate::io::EventLoop;
use crate::scheduler::Scheduler;
use crate::signal::SignalDispatch;
use crate::time::TimerService;
use crate::types::ThreadId;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

thread_local! {
    static CURRENT_THREAD: Cell<ThreadId> = const { Cell::new(ThreadId::ANY) };
}

pub(crate) fn current_thread() -> ThreadId {
    CURRENT_THREAD.with(Cell::get)
}

pub(crate) struct EngineInner {
    pub(crate) scheduler: Scheduler,
    pub(crate) event_loops: Vec<EventLoop>,
    pub(crate) timers: Vec<TimerService>,
    pub(crate) signals: Arc<SignalDispatch>,
    config: EngineConfig,
    started: AtomicBool,
}

/// The top-level runtime: a fixed pool of worker threads, each driving one
/// [`EventLoop`] and one [`TimerService`], sharing one work-stealing
/// [`Scheduler`].
pub struct Engine {
    inner: Arc<EngineInner>,
    threads: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

fn core_count() -> u16 {
    // Safety: `sysconf` with `_SC_NPROCESSORS_ONLN` has no preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    u16::try_from(n.max(1)).unwrap_or(1)
}

fn validate(config: &EngineConfig) -> Result<u16, RingError> {
    let available = core_count();
    match config.policy {
        ThreadPolicy::Any => Ok(config.threads.min(available).max(1)),
        ThreadPolicy::AtLeast => Ok(config.threads.max(1)),
        ThreadPolicy::Exact => {
            if config.threads == 0 || config.threads > available {
                Err(RingError::InsufficientThreads {
                    requested: config.threads as usize,
                    available: available as usize,
                })
            } else {
                Ok(config.threads)
            }
        }
    }
}

impl Engine {
    /// # Errors
    ///
    /// Returns [`RingError`] if the configured thread policy cannot be
    /// satisfied, or if bringing up any worker's ring or timer fails.
    pub fn new(config: EngineConfig) -> Result<Self, RingError> {
        let threads = validate(&config)?;
        let mut event_loops = Vec::with_capacity(threads as usize);
        let mut timers = Vec::with_capacity(threads as usize);
        for _ in 0..threads {
            event_loops.push(EventLoop::new(config.ring_entries)?);
            timers.push(TimerService::new()?);
        }

        let signals = Arc::new(SignalDispatch::new()?);

        Ok(Self {
            inner: Arc::new(EngineInner {
                scheduler: Scheduler::new(threads as usize),
                event_loops,
                timers,
                signals,
                config,
                started: AtomicBool::new(false),
            }),
            threads: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        Handle {
            inner: self.inner.clone(),
        }
    }

    #[must_use]
    pub fn number_of_workers(&self) -> usize {
        self.inner.event_loops.len()
    }

    #[must_use]
    pub fn current_id() -> ThreadId {
        current_thread()
    }

    /// Starts one OS thread per worker. Idempotent.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(workers = self.number_of_workers(), "starting engine");

        let affinity_offset = self.inner.config.affinity_offset;
        let set_affinity = self.inner.config.set_affinity;

        let mut threads = self.threads.lock().expect("thread list poisoned");
        for idx in 0..self.number_of_workers() {
            let id = ThreadId::new(idx as u16);
            let inner = self.inner.clone();
            let signals = if idx == 0 { Some(self.inner.signals.clone()) } else { None };
            let handle = std::thread::Builder::new()
                .name(format!("ringcore-worker-{idx}"))
                .spawn(move || {
                    if set_affinity {
                        set_worker_affinity(id, affinity_offset);
                    }
                    worker_main(id, inner, signals);
                })
                .expect("failed to spawn worker thread");
            threads.push(handle);
        }
    }

    /// Signals every worker to stop after its current tick and joins them.
    pub fn stop(&self) {
        tracing::info!("stopping engine");
        self.inner.scheduler.stop();
        self.inner.signals.stop();
        let mut threads = self.threads.lock().expect("thread list poisoned");
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn set_worker_affinity(id: ThreadId, offset: u16) {
    // Safety: `cpu_set` is a stack-local, zero-initialized `cpu_set_t`; the
    // pointers passed to the two `libc` calls are valid for their duration.
    unsafe {
        let mut cpu_set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut cpu_set);
        let cpu = usize::from(id.index() as u16 + offset);
        libc::CPU_SET(cpu % libc::CPU_SETSIZE as usize, &mut cpu_set);
        let result = libc::pthread_setaffinity_np(
            libc::pthread_self(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpu_set,
        );
        if result != 0 {
            tracing::warn!(?id, "failed to set worker thread affinity");
        }
    }
}

fn worker_main(id: ThreadId, inner: Arc<EngineInner>, signals: Option<Arc<SignalDispatch>>) {
    CURRENT_THREAD.with(|c| c.set(id));
    inner.scheduler.register_thread(id);
    let span = tracing::info_span!("worker main loop", worker = ?id);
    let _entered = span.enter();
    tracing::debug!("worker started");

    let event_loop = &inner.event_loops[id.index()];
    let timer = &inner.timers[id.index()];

    while !inner.scheduler.is_stopped() {
        let polled = inner.scheduler.tick(id, 64);
        event_loop.poll();
        timer.fire();
        if let Some(signals) = &signals {
            signals.pump();
        }
        if polled == 0 && inner.scheduler.is_stopped() {
            break;
        }
        if polled == 0 {
            tracing::trace!("worker parking");
            event_loop.park(timer.next_deadline());
        }
    }
    tracing::debug!("worker stopped");
}
