// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The process-wide signal dispatcher (spec.md §4.4, C9), grounded on
//! `signal_handler.hpp`/`.cpp`.
//!
//! A self-pipe plus an installed `sigaction` handler that does nothing more
//! than write one byte (the only async-signal-safe thing worth doing);
//! dispatch happens later, serialized through worker thread 0. Per
//! `signal_handler.cpp` the pipe is drained one byte at a time rather than
//! with a single large read — preserved here (spec.md §9, and
//! `SPEC_FULL.md`'s supplement #3).
//!
//! Only one [`SignalDispatch`] may exist per process, since it installs a
//! process-wide `sigaction` (spec.md §7, item 6).

use crate::error::RingError;
use crate::sync::{Observable, Subscription};
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static DISPATCH_RUNNING: AtomicBool = AtomicBool::new(false);
static WRITE_FD: AtomicI32 = AtomicI32::new(-1);

pub struct SignalDispatch {
    read_fd: RawFd,
    write_fd: RawFd,
    observables: spin::Mutex<HashMap<i32, Observable<i32>>>,
    stopped: AtomicBool,
}

impl SignalDispatch {
    /// # Errors
    ///
    /// Returns [`RingError::SignalDispatchAlreadyRunning`] if another
    /// instance is already live in this process, or the underlying `pipe2`
    /// failure.
    pub fn new() -> Result<Self, RingError> {
        if DISPATCH_RUNNING.swap(true, Ordering::AcqRel) {
            return Err(RingError::SignalDispatchAlreadyRunning);
        }

        let mut fds = [0i32; 2];
        // Safety: `fds` is a valid two-element buffer for `pipe2` to fill.
        let result = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
        if result != 0 {
            DISPATCH_RUNNING.store(false, Ordering::Release);
            return Err(RingError::Setup(std::io::Error::last_os_error()));
        }

        WRITE_FD.store(fds[1], Ordering::Release);

        Ok(Self {
            read_fd: fds[0],
            write_fd: fds[1],
            observables: spin::Mutex::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn as_raw_fd(&self) -> RawFd {
        self.read_fd
    }

    /// Installs the process handler for `signum`, forwarding it to
    /// subscribers via [`SignalDispatch::subscribe`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `sigaction` failure, if any.
    pub fn handle(&self, signum: i32) -> std::io::Result<()> {
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = write_one_byte as usize;
        action.sa_flags = libc::SA_RESTART;
        // Safety: `action` is a fully-initialized `sigaction`; `signum` is
        // caller-provided but `sigaction` itself validates it.
        let result = unsafe { libc::sigaction(signum, &action, std::ptr::null_mut()) };
        if result != 0 {
            return Err(std::io::Error::last_os_error());
        }
        self.observables.lock().entry(signum).or_default();
        Ok(())
    }

    /// Subscribes to deliveries of `signum`. [`SignalDispatch::handle`] must
    /// have been called for this signal first.
    #[must_use]
    pub fn subscribe(&self, signum: i32) -> Subscription<i32> {
        self.observables
            .lock()
            .entry(signum)
            .or_default()
            .subscribe()
    }

    /// Drains the self-pipe one byte at a time and fans each out to the
    /// corresponding signal's observable. Called from worker thread 0's main
    /// loop.
    pub fn pump(&self) {
        loop {
            let mut byte = [0u8; 1];
            // Safety: `byte` is a valid one-byte buffer; `read_fd` is
            // non-blocking so this never stalls the worker.
            let n = unsafe { libc::read(self.read_fd, byte.as_mut_ptr().cast(), 1) };
            if n <= 0 {
                break;
            }
            let signum = i32::from(byte[0]);
            if let Some(observable) = self.observables.lock().get(&signum) {
                // Delivery to each subscription happens eagerly inside
                // `emit`, before this future is ever polled; `pump` runs
                // outside an async context, so it can't await the returned
                // future's "every subscriber has consumed it" guarantee.
                let _ = observable.emit(signum);
            }
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

impl Drop for SignalDispatch {
    fn drop(&mut self) {
        // Safety: both fds were created by this struct's `pipe2` call and
        // each is closed exactly once.
        unsafe {
            libc::close(self.read_fd);
            libc::close(self.write_fd);
        }
        WRITE_FD.store(-1, Ordering::Release);
        DISPATCH_RUNNING.store(false, Ordering::Release);
    }
}

extern "C" fn write_one_byte(signum: libc::c_int) {
    let fd = WRITE_FD.load(Ordering::Acquire);
    if fd < 0 {
        return;
    }
    let byte = [signum as u8];
    // Safety: async-signal-safe; `write` on a nonblocking pipe never blocks
    // or allocates.
    unsafe {
        libc::write(fd, byte.as_ptr().cast(), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_instance_is_rejected() {
        let first = SignalDispatch::new();
        if first.is_ok() {
            let second = SignalDispatch::new();
            assert!(matches!(
                second,
                Err(RingError::SignalDispatchAlreadyRunning)
            ));
        }
    }
}
