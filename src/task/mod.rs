// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Task primitives and suspension plumbing (spec.md §4.1).
//!
//! The original models a task as a coroutine frame the engine resumes
//! through a raw handle. Here a task is any `Future<Output = ()> + Send`,
//! boxed once at spawn time and driven by the [`crate::scheduler`] the same
//! way `async-exec`'s `Schedule` trait drives its `TaskRef`s — minus the
//! intrusive, hand-rolled vtable, since a trait object already gives us type
//! erasure without `unsafe`.

pub mod builder;
pub mod generator;
pub mod oneshot;
pub mod pause;
pub mod visitor;

pub use builder::{JoinHandle, TaskBuilder};
pub use generator::{GeneratorFuture, GeneratorHandle};
pub use oneshot::OneShotFuture;
pub use pause::{pause, unpause, PauseCell, PausePack};
pub use visitor::{VisitorFuture, VisitorHandle};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A boxed, type-erased unit of work the scheduler polls to completion.
pub(crate) type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

pub(crate) fn boxed<F>(fut: F) -> BoxedTask
where
    F: Future<Output = ()> + Send + 'static,
{
    Box::pin(fut)
}

/// Voluntarily yields once, letting the scheduler run other ready tasks
/// before this one resumes.
///
/// Grounded on `async-exec`'s `task::yield_now`.
pub async fn yield_now() {
    YieldNow { yielded: false }.await;
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_now_completes_on_second_poll() {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = Box::pin(yield_now());
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Pending);
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(()));
    }
}
