// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A listening TCP socket (spec.md §4.3, grounded on `tcp_networking.hpp`'s
//! `tcp_acceptor`).

use super::stream::TcpStream;
use crate::engine::Handle;
use crate::io::ops;
use crate::types::ThreadId;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

pub struct TcpAcceptor {
    handle: Handle,
    thread: ThreadId,
    fd: AtomicI32,
    last_error: AtomicI32,
}

impl TcpAcceptor {
    #[must_use]
    pub fn new(handle: Handle, thread: ThreadId) -> Self {
        Self {
            handle,
            thread,
            fd: AtomicI32::new(-1),
            last_error: AtomicI32::new(0),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> RawFd {
        self.fd.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> i32 {
        self.last_error.swap(0, Ordering::AcqRel)
    }

    /// Opens a listening socket on `port`, equivalent to
    /// `socket(2)`/`bind(2)`/`listen(2)`.
    pub fn listen(&self, family: i32, port: u16, backlog: i32) -> bool {
        // Safety: `socket` with these arguments never dereferences a
        // pointer; the returned fd, if valid, is owned by this call.
        let fd = unsafe { libc::socket(family, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0) };
        if fd < 0 {
            self.last_error.store(std::io::Error::last_os_error().raw_os_error().unwrap_or(-1), Ordering::Release);
            return false;
        }

        let one: i32 = 1;
        // Safety: `one` is a valid `i32` out-lived by the call, `fd` is
        // freshly created and owned here.
        unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                std::ptr::from_ref(&one).cast(),
                std::mem::size_of::<i32>() as libc::socklen_t,
            );
        }

        let bound = match family {
            libc::AF_INET => {
                let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
                addr.sin_family = libc::AF_INET as libc::sa_family_t;
                addr.sin_port = port.to_be();
                addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();
                // Safety: `addr` is a fully-initialized `sockaddr_in` sized
                // correctly for the cast `bind` expects.
                unsafe {
                    libc::bind(
                        fd,
                        std::ptr::from_ref(&addr).cast(),
                        std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    )
                }
            }
            _ => {
                let mut addr: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
                addr.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                addr.sin6_port = port.to_be();
                // Safety: same as above, sized for `sockaddr_in6`.
                unsafe {
                    libc::bind(
                        fd,
                        std::ptr::from_ref(&addr).cast(),
                        std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                    )
                }
            }
        };

        if bound != 0 {
            self.last_error.store(std::io::Error::last_os_error().raw_os_error().unwrap_or(-1), Ordering::Release);
            // Safety: `fd` was just opened by this call and is not yet
            // shared.
            unsafe {
                libc::close(fd);
            }
            return false;
        }

        // Safety: `fd` is a valid, bound socket owned by this call.
        if unsafe { libc::listen(fd, backlog) } != 0 {
            self.last_error.store(std::io::Error::last_os_error().raw_os_error().unwrap_or(-1), Ordering::Release);
            unsafe {
                libc::close(fd);
            }
            return false;
        }

        self.fd.store(fd, Ordering::Release);
        true
    }

    /// Accepts the next pending connection, or `None` on error (with
    /// [`TcpAcceptor::last_error`] set).
    pub async fn accept(&self) -> Option<TcpStream> {
        let fd = self.descriptor();
        let result = ops::accept(&self.handle.event_loop(self.thread).ring, fd).await;
        if result >= 0 {
            Some(TcpStream::new(self.handle.clone(), self.thread, result))
        } else {
            self.last_error.store(-result, Ordering::Release);
            None
        }
    }

    /// Closes the listening socket.
    pub async fn close(&self) -> bool {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd < 0 {
            return true;
        }
        ops::close(&self.handle.event_loop(self.thread).ring, fd).await >= 0
    }

    /// Cancellation of a pending accept is left to dropping the future that
    /// is awaiting it — see [`TcpStream::cancel_read`] for the same
    /// reasoning.
    pub async fn cancel(&self) {}
}

impl Drop for TcpAcceptor {
    fn drop(&mut self) {
        let fd = self.fd.load(Ordering::Acquire);
        if fd >= 0 {
            // Safety: `fd` is owned exclusively by this acceptor.
            unsafe {
                libc::close(fd);
            }
        }
    }
}
