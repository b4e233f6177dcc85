// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Individual awaitable ring operations (spec.md §4.3): each builds one SQE,
//! submits it through [`Ring::submit`], and suspends via [`pause`] until the
//! matching CQE lands. The raw `i32` result is returned exactly as the ring
//! reports it (negative errno on failure) — per spec.md §7 this is the wire
//! contract, not something to re-box into a `Result` on every poll.

use super::buffers::FixedBuffer;
use super::ring::Ring;
use crate::task::pause::{PauseCell, SUBMIT_FAILED};
use crate::task::pause;
use io_uring::{opcode, types};
use std::os::fd::RawFd;

async fn submit(ring: &Ring, entry: io_uring::squeue::Entry) -> i32 {
    pause(move |cell: PauseCell| {
        if ring.submit(entry, cell.clone()).is_err() {
            cell.complete(SUBMIT_FAILED);
        }
    })
    .await
    .scratch
}

pub async fn openat(ring: &Ring, path: &std::ffi::CStr, flags: i32, mode: u32) -> i32 {
    let entry = opcode::OpenAt::new(types::Fd(libc::AT_FDCWD), path.as_ptr())
        .flags(flags)
        .mode(mode)
        .build();
    submit(ring, entry).await
}

pub async fn close(ring: &Ring, fd: RawFd) -> i32 {
    let entry = opcode::Close::new(types::Fd(fd)).build();
    submit(ring, entry).await
}

pub async fn read(ring: &Ring, fd: RawFd, buf: &mut [u8], offset: u64) -> i32 {
    let entry = opcode::Read::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as u32)
        .offset(offset)
        .build();
    submit(ring, entry).await
}

pub async fn write(ring: &Ring, fd: RawFd, buf: &[u8], offset: u64) -> i32 {
    let entry = opcode::Write::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32)
        .offset(offset)
        .build();
    submit(ring, entry).await
}

pub async fn readv(ring: &Ring, fd: RawFd, iovecs: &[libc::iovec], offset: u64) -> i32 {
    let entry = opcode::Readv::new(types::Fd(fd), iovecs.as_ptr(), iovecs.len() as u32)
        .offset(offset)
        .build();
    submit(ring, entry).await
}

pub async fn writev(ring: &Ring, fd: RawFd, iovecs: &[libc::iovec], offset: u64) -> i32 {
    let entry = opcode::Writev::new(types::Fd(fd), iovecs.as_ptr(), iovecs.len() as u32)
        .offset(offset)
        .build();
    submit(ring, entry).await
}

pub async fn read_fixed(ring: &Ring, fd: RawFd, buf: &mut FixedBuffer<'_>, offset: u64) -> i32 {
    let index = buf.index();
    let entry = opcode::ReadFixed::new(
        types::Fd(fd),
        buf.as_mut_slice().as_mut_ptr(),
        super::buffers::BUFFER_SIZE as u32,
        index,
    )
    .offset(offset)
    .build();
    submit(ring, entry).await
}

pub async fn write_fixed(ring: &Ring, fd: RawFd, buf: &FixedBuffer<'_>, offset: u64) -> i32 {
    let index = buf.index();
    let entry = opcode::WriteFixed::new(
        types::Fd(fd),
        buf.as_slice().as_ptr(),
        super::buffers::BUFFER_SIZE as u32,
        index,
    )
    .offset(offset)
    .build();
    submit(ring, entry).await
}

pub async fn recv(ring: &Ring, fd: RawFd, buf: &mut [u8]) -> i32 {
    let entry = opcode::Recv::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as u32).build();
    submit(ring, entry).await
}

pub async fn send(ring: &Ring, fd: RawFd, buf: &[u8]) -> i32 {
    let entry = opcode::Send::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32).build();
    submit(ring, entry).await
}

pub async fn accept(ring: &Ring, fd: RawFd) -> i32 {
    let entry = opcode::Accept::new(types::Fd(fd), std::ptr::null_mut(), std::ptr::null_mut())
        .build();
    submit(ring, entry).await
}

pub async fn connect(ring: &Ring, fd: RawFd, addr: &libc::sockaddr, len: libc::socklen_t) -> i32 {
    let entry = opcode::Connect::new(types::Fd(fd), std::ptr::from_ref(addr), len).build();
    submit(ring, entry).await
}

/// Requests cancellation of an in-flight operation's pause cell.
///
/// This is an in-process cancellation only — it does not issue an
/// `IORING_OP_ASYNC_CANCEL` against the kernel, it just races the
/// completion and, if it wins, resumes the awaiter with the cancel
/// sentinel. The underlying syscall may still complete later; its result is
/// simply discarded by [`Ring::drain_completions`](super::ring::Ring) once
/// the slab slot is gone.
pub fn cancel_event(cell: &PauseCell) -> bool {
    cell.try_cancel(1)
}
