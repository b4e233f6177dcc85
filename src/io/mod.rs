// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The per-worker event loop (spec.md §4.3, C5): one [`Ring`] plus the
//! legacy [`Notifier`] per worker thread, grounded on `event_loop.hpp`.

pub mod buffers;
pub mod notifier;
pub mod ops;
pub mod ring;

pub use buffers::FixedBufferPool;
pub use notifier::Notifier;
pub use ring::Ring;

use crate::error::RingError;
use crate::types::Order;

pub struct EventLoop {
    pub ring: Ring,
    pub notifier: Notifier,
    pub buffers: FixedBufferPool,
}

impl EventLoop {
    pub fn new(ring_entries: u32) -> Result<Self, RingError> {
        let ring = Ring::new(ring_entries)?;
        let buffers = FixedBufferPool::new();
        ring.register_buffers(&buffers.iovecs())?;
        let notifier = Notifier::new()?;
        ring.register_notifier(notifier.as_raw_fd()).map_err(|_| {
            RingError::Setup(std::io::Error::other(
                "submission queue full while registering legacy notifier",
            ))
        })?;
        Ok(Self {
            ring,
            notifier,
            buffers,
        })
    }

    /// One iteration of the worker's I/O pump: drains whatever completions
    /// are already queued without blocking the scheduler tick.
    pub fn poll(&self) {
        self.ring.drain_completions();
        self.notifier.pump();
    }

    /// Blocks until the ring has at least one completion, then drains it.
    /// Called when a worker has exhausted its run queue and the injector.
    /// `deadline`, if given, bounds the wait so a pending timer is not
    /// missed while nothing else is happening on the ring.
    pub fn park(&self, deadline: Option<Order>) {
        self.ring.submit_and_wait_one(deadline);
        self.notifier.pump();
    }
}
