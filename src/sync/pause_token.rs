// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A manual-reset gate (spec.md §5, grounded on `pause_token.hpp`): while
//! paused, waiters queue; `unpause` opens the gate and wakes everyone queued,
//! and any task that checks while open passes straight through.

use super::waitlist::WaitList;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

pub struct PauseToken {
    paused: AtomicBool,
    waiters: WaitList,
}

impl PauseToken {
    #[must_use]
    pub const fn new(start_paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(start_paused),
            waiters: WaitList::new(),
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Closes the gate; future waiters queue until the next `unpause`.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Opens the gate and wakes every queued waiter.
    pub fn unpause(&self) {
        self.paused.store(false, Ordering::Release);
        self.waiters.wake_all();
    }

    pub async fn wait(&self) {
        loop {
            if PauseWait { token: self }.await {
                return;
            }
        }
    }
}

struct PauseWait<'a> {
    token: &'a PauseToken,
}

impl Future for PauseWait<'_> {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        if !self.token.is_paused() {
            return Poll::Ready(true);
        }
        self.token.waiters.push(cx.waker().clone());
        if !self.token.is_paused() {
            return Poll::Ready(true);
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpause_releases_gate() {
        let token = PauseToken::new(true);
        assert!(token.is_paused());
        token.unpause();
        assert!(!token.is_paused());
    }
}
