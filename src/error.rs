// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Hand-rolled error types (spec.md §7). No `thiserror`, no `anyhow` — small
//! enums that implement `Display`/`Error` directly, with `From` impls at the
//! natural conversion points.

use std::fmt;

/// Returned when an operation targets an already-closed cell, channel, or
/// engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("closed")
    }
}

impl std::error::Error for Closed {}

/// Failure to spawn a task (spec.md §4.1).
#[derive(Debug)]
pub enum SpawnError {
    /// The engine is shutting down or has stopped.
    Closed,
    /// Allocating the task's state failed.
    Alloc,
}

impl From<Closed> for SpawnError {
    fn from(_: Closed) -> Self {
        Self::Closed
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("engine was stopped"),
            Self::Alloc => f.write_str("task allocation failed"),
        }
    }
}

impl std::error::Error for SpawnError {}

/// Failure to bring up the io_uring ring, timer service, or signal
/// dispatcher (spec.md §7, items 1 and 6).
#[derive(Debug)]
pub enum RingError {
    /// `io_uring_setup` (or an equivalent ring ioctl) failed.
    Setup(std::io::Error),
    /// The configured worker count could not be satisfied under an `EXACT`
    /// or `AT_LEAST` policy (spec.md §6).
    InsufficientThreads { requested: usize, available: usize },
    /// A second `SignalDispatch` was instantiated in this process
    /// (spec.md §7, item 6).
    SignalDispatchAlreadyRunning,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(err) => write!(f, "failed to set up io_uring: {err}"),
            Self::InsufficientThreads {
                requested,
                available,
            } => write!(
                f,
                "requested {requested} worker threads but only {available} are available"
            ),
            Self::SignalDispatchAlreadyRunning => {
                f.write_str("a signal dispatcher is already running in this process")
            }
        }
    }
}

impl std::error::Error for RingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Setup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RingError {
    fn from(err: std::io::Error) -> Self {
        Self::Setup(err)
    }
}

/// Submitting an I/O operation to a worker's ring failed because the
/// submission queue was full (spec.md §7, item 2).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SubmitError;

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("submission queue is full")
    }
}

impl std::error::Error for SubmitError {}
