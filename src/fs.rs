// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Asynchronous file I/O (spec.md §4.3), grounded on `async_file.hpp`.

use crate::engine::Handle;
use crate::io::ops;
use crate::types::ThreadId;
use std::ffi::CString;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

/// How to open a file, mirroring `async_file`'s `file::Option` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOption {
    Read,
    Trunc,
    Append,
    ReadWrite,
    RWTruncate,
    RWAppend,
}

impl OpenOption {
    fn flags(self) -> i32 {
        match self {
            OpenOption::Read => libc::O_RDONLY,
            OpenOption::Trunc => libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            OpenOption::Append => libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
            OpenOption::ReadWrite => libc::O_RDWR,
            OpenOption::RWTruncate => libc::O_RDWR | libc::O_CREAT | libc::O_TRUNC,
            OpenOption::RWAppend => libc::O_RDWR | libc::O_CREAT | libc::O_APPEND,
        }
    }
}

/// Where to seek from, mirroring `async_file`'s `file::Offset` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Begin,
    Current,
    End,
}

impl SeekFrom {
    fn whence(self) -> i32 {
        match self {
            SeekFrom::Begin => libc::SEEK_SET,
            SeekFrom::Current => libc::SEEK_CUR,
            SeekFrom::End => libc::SEEK_END,
        }
    }
}

const DEFAULT_MODE: u32 = (libc::S_IRUSR | libc::S_IWUSR) as u32;

pub struct File {
    handle: Handle,
    thread: ThreadId,
    fd: AtomicI32,
}

impl File {
    #[must_use]
    pub fn new(handle: Handle, thread: ThreadId) -> Self {
        Self {
            handle,
            thread,
            fd: AtomicI32::new(-1),
        }
    }

    #[must_use]
    pub fn good(&self) -> bool {
        self.fd.load(Ordering::Acquire) >= 0
    }

    fn ring(&self) -> &crate::io::Ring {
        &self.handle.event_loop(self.thread).ring
    }

    /// Opens `path` relative to the current directory with the given
    /// [`OpenOption`].
    pub async fn open(&self, path: &str, option: OpenOption) -> bool {
        self.open_with(path, option.flags(), DEFAULT_MODE).await
    }

    /// Opens `path` with raw `open(2)` flags/mode, for callers that need
    /// finer control than [`OpenOption`] offers.
    pub async fn open_with(&self, path: &str, flags: i32, mode: u32) -> bool {
        if mode == 0 && (flags & (libc::O_CREAT | libc::O_TMPFILE)) != 0 {
            return false;
        }
        let Ok(cpath) = CString::new(path) else {
            return false;
        };
        let result = ops::openat(self.ring(), &cpath, flags, mode).await;
        if result >= 0 {
            self.fd.store(result, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Reads up to `data.len()` bytes starting at the current cursor,
    /// advancing it by the amount actually read.
    pub async fn read_some(&self, data: &mut [u8]) -> usize {
        let fd = self.fd.load(Ordering::Acquire);
        let current = seek(fd, 0, SeekFrom::Current);
        let mut total = 0;
        while total != data.len() {
            let to_read = (data.len() - total).min(i32::MAX as usize - 1);
            let result = ops::read(
                self.ring(),
                fd,
                &mut data[total..total + to_read],
                (current + total as i64) as u64,
            )
            .await;
            if result > 0 {
                total += result as usize;
            } else {
                break;
            }
        }
        total
    }

    /// Writes `data` starting at the current cursor, advancing it by the
    /// amount actually written.
    pub async fn write_to_file(&self, data: &[u8]) -> bool {
        let fd = self.fd.load(Ordering::Acquire);
        let current = seek(fd, 0, SeekFrom::Current);
        let mut total = 0;
        while total != data.len() {
            let to_write = (data.len() - total).min(i32::MAX as usize - 1);
            let result = ops::write(
                self.ring(),
                fd,
                &data[total..total + to_write],
                (current + total as i64) as u64,
            )
            .await;
            if result > 0 {
                total += result as usize;
            } else {
                break;
            }
        }
        total == data.len()
    }

    /// Repositions the file cursor, mirroring `async_file::position`.
    pub fn position(&self, pos: u64, whence: SeekFrom) -> bool {
        let fd = self.fd.load(Ordering::Acquire);
        seek(fd, pos as i64, whence) >= 0
    }

    /// Returns the file's total size without disturbing the current cursor.
    #[must_use]
    pub fn size(&self) -> i64 {
        let fd = self.fd.load(Ordering::Acquire);
        let current = seek(fd, 0, SeekFrom::Current);
        let size = seek(fd, 0, SeekFrom::End);
        seek(fd, current, SeekFrom::Begin);
        size
    }

    /// Closes the file. Recommended before the `File` is dropped, since
    /// dropping spawns a background close instead.
    pub async fn close(&self) -> bool {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd < 0 {
            return true;
        }
        ops::close(self.ring(), fd).await >= 0
    }
}

fn seek(fd: RawFd, pos: i64, whence: SeekFrom) -> i64 {
    if fd < 0 {
        return -1;
    }
    // Safety: `fd` is a valid, open file descriptor for the duration of
    // this call.
    unsafe { libc::lseek(fd, pos, whence.whence()) }
}

impl Drop for File {
    fn drop(&mut self) {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd < 0 {
            return;
        }
        let spawner = self.handle.clone();
        let closer = self.handle.clone();
        let thread = self.thread;
        spawner.spawn_detached(async move {
            ops::close(&closer.event_loop(thread).ring, fd).await;
        });
    }
}
