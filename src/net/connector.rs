// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Outbound TCP connection helper (spec.md §4.3, grounded on
//! `tcp_networking.hpp`'s `tcp_connect`).

use super::stream::TcpStream;
use crate::engine::Handle;
use crate::io::ops;
use crate::types::ThreadId;
use std::net::SocketAddr;

/// Opens a TCP connection to `addr`, suspending until it completes or fails.
pub async fn connect(handle: &Handle, thread: ThreadId, addr: SocketAddr) -> Result<TcpStream, i32> {
    let family = if addr.is_ipv4() {
        libc::AF_INET
    } else {
        libc::AF_INET6
    };

    // Safety: arguments are fixed, valid constants; the returned fd, if
    // non-negative, is exclusively owned by this call.
    let fd = unsafe { libc::socket(family, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error().raw_os_error().unwrap_or(-1));
    }

    let result = match addr {
        SocketAddr::V4(v4) => {
            let mut sockaddr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
            sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
            sockaddr.sin_port = v4.port().to_be();
            sockaddr.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());
            // Safety: `sockaddr` outlives the reference; reinterpreting its
            // address as `*const sockaddr` only narrows the read, it never
            // reads past the allocation (`sockaddr_in` is the same size as
            // `sockaddr` on Linux).
            let generic: &libc::sockaddr =
                unsafe { &*std::ptr::from_ref(&sockaddr).cast::<libc::sockaddr>() };
            ops::connect(
                &handle.event_loop(thread).ring,
                fd,
                generic,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
            .await
        }
        SocketAddr::V6(v6) => {
            let mut sockaddr: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
            sockaddr.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sockaddr.sin6_port = v6.port().to_be();
            sockaddr.sin6_addr.s6_addr = v6.ip().octets();
            // Safety: reinterpreting the address as `*const sockaddr` only
            // narrows the read to `sockaddr`'s size, which is smaller than
            // `sockaddr_in6`'s actual allocation, so no out-of-bounds read
            // occurs; the full `sockaddr_in6` bytes are still reachable from
            // this same pointer for the length `ops::connect` is told.
            let generic: &libc::sockaddr =
                unsafe { &*std::ptr::from_ref(&sockaddr).cast::<libc::sockaddr>() };
            ops::connect(
                &handle.event_loop(thread).ring,
                fd,
                generic,
                std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
            )
            .await
        }
    };

    if result == 0 {
        Ok(TcpStream::new(handle.clone(), thread, fd))
    } else {
        // Safety: `fd` is exclusively owned here since the stream was never
        // constructed.
        unsafe {
            libc::close(fd);
        }
        Err(-result)
    }
}
