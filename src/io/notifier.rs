// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The legacy edge-triggered descriptor notifier (spec.md §4.3, C10),
//! grounded on `descriptor_notifications.hpp`/`.cpp`: a secondary `epoll`
//! instance for watching a caller-supplied descriptor become readable or
//! writable without issuing a ring read/write against it. It is itself
//! registered as one more fd the ring polls, so it never needs its own
//! blocking wait.

use crate::task::{pause, PausePack};
use std::collections::HashMap;
use std::os::fd::{AsRawFd, RawFd};

pub struct Notifier {
    epoll_fd: RawFd,
    waiters: spin::Mutex<HashMap<RawFd, crate::task::PauseCell>>,
}

impl Notifier {
    /// # Errors
    ///
    /// Returns the `epoll_create1` failure, if any.
    pub fn new() -> std::io::Result<Self> {
        // Safety: `epoll_create1` has no preconditions beyond a valid flags
        // argument; `0` is always valid.
        let epoll_fd = unsafe { libc::epoll_create1(0) };
        if epoll_fd < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(Self {
            epoll_fd,
            waiters: spin::Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn as_raw_fd(&self) -> RawFd {
        self.epoll_fd
    }

    async fn wait_for(&self, fd: RawFd, events: u32) -> PausePack {
        let mut event = libc::epoll_event {
            events: events | libc::EPOLLONESHOT as u32,
            u64: fd as u64,
        };
        pause(move |cell| {
            self.waiters.lock().insert(fd, cell);
            // Safety: `event` and `fd` outlive this call, and
            // `EPOLL_CTL_ADD` only reads from `event`.
            let result =
                unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, fd, &mut event) };
            if result < 0 {
                if let Some(cell) = self.waiters.lock().remove(&fd) {
                    cell.complete(-std::io::Error::last_os_error().raw_os_error().unwrap_or(-1));
                }
            }
        })
        .await
    }

    /// Suspends until `fd` becomes readable.
    pub async fn wait_readable(&self, fd: RawFd) -> i32 {
        self.wait_for(fd, libc::EPOLLIN as u32).await.scratch
    }

    /// Suspends until `fd` becomes writable.
    pub async fn wait_writable(&self, fd: RawFd) -> i32 {
        self.wait_for(fd, libc::EPOLLOUT as u32).await.scratch
    }

    /// Called by the owning event loop once the ring reports the epoll fd
    /// itself is readable: drains ready events and completes their waiters.
    pub fn pump(&self) {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 64];
        loop {
            // Safety: `events` is a valid, appropriately-sized buffer for
            // `epoll_wait` to write up to `events.len()` entries into.
            let n = unsafe {
                libc::epoll_wait(self.epoll_fd, events.as_mut_ptr(), events.len() as i32, 0)
            };
            if n <= 0 {
                break;
            }
            for event in &events[..n as usize] {
                let fd = event.u64 as RawFd;
                if let Some(cell) = self.waiters.lock().remove(&fd) {
                    cell.complete(0);
                }
            }
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Safety: `epoll_fd` was created by this struct and is closed
        // exactly once.
        unsafe {
            libc::close(self.epoll_fd);
        }
    }
}

impl AsRawFd for Notifier {
    fn as_raw_fd(&self) -> RawFd {
        self.epoll_fd
    }
}
