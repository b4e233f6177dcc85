// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `for_each` (spec.md §4.6, grounded on `for_each.hpp`): drives a
//! [`GeneratorFuture`] to completion, handing each yielded value to a
//! callback that may request early termination.

use crate::task::GeneratorFuture;
use std::future::Future;

/// Signals whether [`for_each`] should keep driving the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForCtl {
    Break,
    Continue,
}

/// Feeds every value yielded by `generator` to `functor`, stopping either
/// when the generator completes or `functor` returns [`ForCtl::Break`].
pub async fn for_each<T, Fut, Functor>(mut generator: GeneratorFuture<T>, mut functor: Functor)
where
    Functor: FnMut(T) -> Fut,
    Fut: Future<Output = ForCtl>,
{
    loop {
        match std::future::poll_fn(|cx| generator.poll_next(cx)).await {
            Some(value) => {
                if functor(value).await == ForCtl::Break {
                    generator.complete();
                    break;
                }
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn stops_on_break_before_generator_completes() {
        let generator = GeneratorFuture::new(|handle| async move {
            handle.yield_value(1).await;
            handle.yield_value(2).await;
            handle.yield_value(3).await;
        });

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let driven = for_each(generator, move |value: i32| {
            let seen = seen_clone.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                if value == 2 {
                    ForCtl::Break
                } else {
                    ForCtl::Continue
                }
            }
        });

        let waker = std::task::Waker::noop();
        let mut cx = std::task::Context::from_waker(waker);
        let mut fut = Box::pin(driven);
        loop {
            match fut.as_mut().poll(&mut cx) {
                std::task::Poll::Ready(()) => break,
                std::task::Poll::Pending => continue,
            }
        }
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
