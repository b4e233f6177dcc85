// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Counting and binary semaphores (spec.md §5, grounded on
//! `async_semaphore.hpp`'s `async_counting_semaphore`/`async_binary_semaphore`).

use super::waitlist::WaitList;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::task::{Context, Poll};

/// A counting semaphore with `N` initial permits.
pub struct Semaphore {
    permits: AtomicIsize,
    waiters: WaitList,
}

impl Semaphore {
    #[must_use]
    pub const fn new(permits: isize) -> Self {
        Self {
            permits: AtomicIsize::new(permits),
            waiters: WaitList::new(),
        }
    }

    /// Attempts to acquire one permit without suspending.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.permits.load(Ordering::Acquire);
        while current > 0 {
            match self.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Acquires one permit, suspending until one is available.
    pub async fn acquire(&self) {
        loop {
            if AcquireWait { sem: self }.await {
                return;
            }
        }
    }

    /// Releases `count` permits, waking up to `count` waiters.
    pub fn release(&self, count: isize) {
        self.permits.fetch_add(count, Ordering::Release);
        let count = usize::try_from(count).unwrap_or(0);
        for _ in 0..count {
            self.waiters.wake_one();
        }
    }

    #[must_use]
    pub fn available_permits(&self) -> isize {
        self.permits.load(Ordering::Acquire)
    }
}

struct AcquireWait<'a> {
    sem: &'a Semaphore,
}

impl Future for AcquireWait<'_> {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        if self.sem.try_acquire() {
            return Poll::Ready(true);
        }
        self.sem.waiters.push(cx.waker().clone());
        if self.sem.try_acquire() {
            return Poll::Ready(true);
        }
        Poll::Pending
    }
}

/// A semaphore with exactly one permit, the building block for [`super::mutex::Mutex`].
pub struct BinarySemaphore(Semaphore);

impl BinarySemaphore {
    #[must_use]
    pub const fn new(locked: bool) -> Self {
        Self(Semaphore::new(if locked { 0 } else { 1 }))
    }

    pub fn try_acquire(&self) -> bool {
        self.0.try_acquire()
    }

    pub async fn acquire(&self) {
        self.0.acquire().await;
    }

    pub fn release(&self) {
        self.0.release(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_respects_permit_count() {
        let sem = Semaphore::new(1);
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        sem.release(1);
        assert!(sem.try_acquire());
    }
}
