// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A cyclic phase barrier (spec.md §5, grounded on `async_barrier.hpp`),
//! including the original's `arrive`/[`ArrivalToken`] split — arriving
//! without suspending immediately, then awaiting the phase later — plus its
//! optional per-phase completion step and `arrive_and_drop`.

use super::waitlist::WaitList;
use crate::engine::Handle;
use crate::types::ThreadId;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

struct State {
    /// Remaining arrivals expected before the current phase completes.
    count: usize,
    phase: u64,
    /// The party count that takes effect starting the *next* phase;
    /// `arrive_and_drop` lowers this without disturbing `count` for the
    /// phase already in flight.
    next_parties: usize,
}

enum Completion {
    None,
    /// Run inline, on whichever party's arrival completes the phase.
    Plain(Box<dyn Fn() + Send + Sync>),
    /// Run on a specific worker, hopping there first if the completing
    /// party isn't already on it. `self_ref` lets the hand-off own an
    /// `Arc` back to the barrier so it can wake waiters once the
    /// completion has actually run on the pinned thread.
    Pinned {
        handle: Handle,
        thread: ThreadId,
        func: Arc<dyn Fn() + Send + Sync>,
        self_ref: Weak<Barrier>,
    },
}

pub struct Barrier {
    state: spin::Mutex<State>,
    waiters: WaitList,
    completion: Completion,
}

impl Barrier {
    #[must_use]
    pub fn new(parties: usize) -> Self {
        Self {
            state: spin::Mutex::new(State {
                count: parties,
                phase: 0,
                next_parties: parties,
            }),
            waiters: WaitList::new(),
            completion: Completion::None,
        }
    }

    /// A barrier whose completion function runs once per phase, inline, on
    /// whichever party's arrival completes that phase.
    #[must_use]
    pub fn with_completion<F>(parties: usize, completion: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            state: spin::Mutex::new(State {
                count: parties,
                phase: 0,
                next_parties: parties,
            }),
            waiters: WaitList::new(),
            completion: Completion::Plain(Box::new(completion)),
        }
    }

    /// A barrier whose completion function runs once per phase, pinned to
    /// `thread`. Since releasing a phase may need to hop to that thread
    /// after the barrier itself has already returned control to its
    /// completing party, the barrier must live behind an `Arc`.
    #[must_use]
    pub fn with_completion_pinned<F>(
        parties: usize,
        handle: Handle,
        thread: ThreadId,
        completion: F,
    ) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new_cyclic(|self_ref| Self {
            state: spin::Mutex::new(State {
                count: parties,
                phase: 0,
                next_parties: parties,
            }),
            waiters: WaitList::new(),
            completion: Completion::Pinned {
                handle,
                thread,
                func: Arc::new(completion),
                self_ref: self_ref.clone(),
            },
        })
    }

    /// Arrives at this phase without suspending, returning a token that can
    /// be awaited later to block until the phase completes.
    pub fn arrive(&self) -> ArrivalToken<'_> {
        let (phase_at_arrival, completed_phase) = {
            let mut state = self.state.lock();
            let observed = state.phase;
            state.count -= 1;
            let completed = state.count == 0;
            if completed {
                state.count = state.next_parties;
                state.phase += 1;
            }
            (observed, completed)
        };
        if completed_phase {
            self.release_phase();
        }
        ArrivalToken {
            barrier: self,
            phase: phase_at_arrival,
        }
    }

    /// Arrives at this phase and suspends until every party has arrived.
    pub async fn wait(&self) {
        self.arrive().await;
    }

    /// Arrives at the current phase, then permanently reduces the number of
    /// parties expected from the next phase onward. Does not suspend: the
    /// dropping party is not expected to `await` this phase's completion.
    pub fn arrive_and_drop(&self) {
        let completed_phase = {
            let mut state = self.state.lock();
            state.next_parties = state.next_parties.saturating_sub(1);
            state.count = state.count.saturating_sub(1);
            let completed = state.count == 0;
            if completed {
                state.count = state.next_parties;
                state.phase += 1;
            }
            completed
        };
        if completed_phase {
            self.release_phase();
        }
    }

    fn release_phase(&self) {
        match &self.completion {
            Completion::None => {
                self.waiters.wake_all();
            }
            Completion::Plain(func) => {
                func();
                self.waiters.wake_all();
            }
            Completion::Pinned {
                handle,
                thread,
                func,
                self_ref,
            } => {
                if handle.current_id() == *thread {
                    func();
                    self.waiters.wake_all();
                } else if let Some(barrier) = self_ref.upgrade() {
                    let func = func.clone();
                    handle.spawn_detached_on(*thread, async move {
                        func();
                        barrier.waiters.wake_all();
                    });
                } else {
                    self.waiters.wake_all();
                }
            }
        }
    }
}

#[must_use = "futures do nothing unless polled"]
pub struct ArrivalToken<'a> {
    barrier: &'a Barrier,
    phase: u64,
}

impl Future for ArrivalToken<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.barrier.state.lock().phase != self.phase {
            return Poll::Ready(());
        }
        self.barrier.waiters.push(cx.waker().clone());
        if self.barrier.state.lock().phase != self.phase {
            return Poll::Ready(());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_advances_once_every_party_arrives() {
        let barrier = Barrier::new(2);
        assert_eq!(barrier.state.lock().phase, 0);
        let _first = barrier.arrive();
        assert_eq!(barrier.state.lock().phase, 0);
        let _second = barrier.arrive();
        assert_eq!(barrier.state.lock().phase, 1);
    }

    #[test]
    fn completion_runs_once_per_phase() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls2 = calls.clone();
        let barrier = Barrier::with_completion(2, move || {
            calls2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let _first = barrier.arrive();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        let _second = barrier.arrive();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        let _third = barrier.arrive();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        let _fourth = barrier.arrive();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn arrive_and_drop_lowers_future_phases_only() {
        let barrier = Barrier::new(3);
        let _first = barrier.arrive();
        barrier.arrive_and_drop();
        assert_eq!(barrier.state.lock().phase, 0);
        let _second = barrier.arrive();
        assert_eq!(barrier.state.lock().phase, 1);
        assert_eq!(barrier.state.lock().count, 2);
    }
}
