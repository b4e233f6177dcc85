// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `wait_for` combinators (spec.md §4.6, grounded on `wait_for.hpp`): await a
//! fixed-size tuple or a homogeneous vector of futures, polling every branch
//! concurrently and returning once all have completed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Awaits a homogeneous collection of futures, returning their outputs in
/// the same order once every one has completed.
pub async fn wait_all<T>(futures: Vec<Pin<Box<dyn Future<Output = T> + Send>>>) -> Vec<T> {
    WaitAll {
        remaining: futures.into_iter().map(Some).collect(),
        outputs: Vec::new(),
    }
    .await
}

struct WaitAll<T> {
    remaining: Vec<Option<Pin<Box<dyn Future<Output = T> + Send>>>>,
    outputs: Vec<Option<T>>,
}

impl<T> Future for WaitAll<T> {
    type Output = Vec<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Vec<T>> {
        if self.outputs.is_empty() {
            self.outputs = self.remaining.iter().map(|_| None).collect();
        }

        let mut all_done = true;
        for (slot, fut) in self.outputs.iter_mut().zip(self.remaining.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            match fut {
                Some(inner) => match inner.as_mut().poll(cx) {
                    Poll::Ready(value) => {
                        *slot = Some(value);
                        *fut = None;
                    }
                    Poll::Pending => all_done = false,
                },
                None => unreachable!("completed futures are cleared alongside their slot"),
            }
        }

        if all_done {
            let outputs = std::mem::take(&mut self.outputs);
            Poll::Ready(outputs.into_iter().map(|v| v.expect("checked above")).collect())
        } else {
            Poll::Pending
        }
    }
}

/// Awaits exactly two futures of (possibly different) output types.
pub async fn wait_two<A, B>(a: A, b: B) -> (A::Output, B::Output)
where
    A: Future,
    B: Future,
{
    WaitTwo {
        a: Some(Box::pin(a)),
        b: Some(Box::pin(b)),
        out_a: None,
        out_b: None,
    }
    .await
}

struct WaitTwo<A: Future, B: Future> {
    a: Option<Pin<Box<A>>>,
    b: Option<Pin<Box<B>>>,
    out_a: Option<A::Output>,
    out_b: Option<B::Output>,
}

impl<A: Future, B: Future> Future for WaitTwo<A, B> {
    type Output = (A::Output, B::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(fut) = this.a.as_mut() {
            if let Poll::Ready(value) = fut.as_mut().poll(cx) {
                this.out_a = Some(value);
                this.a = None;
            }
        }
        if let Some(fut) = this.b.as_mut() {
            if let Poll::Ready(value) = fut.as_mut().poll(cx) {
                this.out_b = Some(value);
                this.b = None;
            }
        }
        if this.out_a.is_some() && this.out_b.is_some() {
            Poll::Ready((this.out_a.take().unwrap(), this.out_b.take().unwrap()))
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_all_preserves_order() {
        let futures: Vec<Pin<Box<dyn Future<Output = i32> + Send>>> =
            vec![Box::pin(async { 1 }), Box::pin(async { 2 }), Box::pin(async { 3 })];
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = Box::pin(wait_all(futures));
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(values) => assert_eq!(values, vec![1, 2, 3]),
            Poll::Pending => panic!("expected immediate completion"),
        }
    }

    #[test]
    fn wait_two_combines_heterogeneous_outputs() {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = Box::pin(wait_two(async { 1 }, async { "two" }));
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready((a, b)) => {
                assert_eq!(a, 1);
                assert_eq!(b, "two");
            }
            Poll::Pending => panic!("expected immediate completion"),
        }
    }
}
