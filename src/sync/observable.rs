// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Multi-producer, multi-consumer fan-out (spec.md §4.5, grounded on
//! `observable.hpp`): `emit` constructs one pending result per live
//! subscription against a shared latch of size N+1, then arrives-and-waits
//! on that latch itself — so `emit` cannot complete until every subscription
//! live at emit time has consumed its copy of the event. Each subscription's
//! consumption is marked by dropping a [`DeliveryGuard`] embedded alongside
//! the value, the same role `observer_guard` plays in the original.
//!
//! Observer lifecycle (spec.md §4.8): CONNECTED on [`Observable::subscribe`],
//! DISCONNECTED on [`Observable::disconnect`], the latter serialized by an
//! internal async mutex so concurrent disconnects can't race each other or a
//! concurrent `subscribe`.

use crate::sync::wait_cell::WaitCell;
use crate::sync::{Latch, Mutex};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Counts an `emit`'s shared latch down when the pending result it is
/// attached to is dropped — i.e. once the subscription holding it has taken
/// the value out of its slot.
struct DeliveryGuard {
    latch: Arc<Latch>,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        self.latch.count_down(1);
    }
}

struct Slot<T> {
    pending: spin::Mutex<Option<(T, DeliveryGuard)>>,
    cell: WaitCell,
}

pub struct Observable<T> {
    subscribers: spin::Mutex<Vec<Arc<Slot<T>>>>,
    disconnect_mtx: Mutex<()>,
}

impl<T: Clone + Send + 'static> Observable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: spin::Mutex::new(Vec::new()),
            disconnect_mtx: Mutex::new(()),
        }
    }

    /// Registers a new subscription, seeing only values emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let slot = Arc::new(Slot {
            pending: spin::Mutex::new(None),
            cell: WaitCell::new(),
        });
        self.subscribers.lock().push(slot.clone());
        Subscription { slot }
    }

    /// Removes `subscription` so future emits no longer reach it. Serialized
    /// against other disconnects by an internal async mutex.
    pub async fn disconnect(&self, subscription: &Subscription<T>) {
        let _guard = self.disconnect_mtx.lock().await;
        self.subscribers
            .lock()
            .retain(|slot| !Arc::ptr_eq(slot, &subscription.slot));
    }

    /// Delivers `value` to every subscription live at this instant. The
    /// returned future resolves once every one of them has consumed its
    /// copy; dropping it unpolled still delivers the value (delivery happens
    /// eagerly, before the first poll) but forfeits observing completion.
    #[must_use = "the emit only blocks on consumer delivery if awaited"]
    pub fn emit(&self, value: T) -> EmitFuture {
        let subs = self.subscribers.lock().clone();
        let party_count = isize::try_from(subs.len()).unwrap_or(isize::MAX);
        let latch = Arc::new(Latch::new(party_count.saturating_add(1)));
        for sub in &subs {
            let guard = DeliveryGuard {
                latch: latch.clone(),
            };
            *sub.pending.lock() = Some((value.clone(), guard));
            sub.cell.wake();
        }
        EmitFuture { latch, inner: None }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T: Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`Observable::emit`]; resolves once every subscription
/// that was live at emit time has consumed its copy of the event.
#[must_use = "futures do nothing unless polled"]
pub struct EmitFuture {
    latch: Arc<Latch>,
    inner: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

impl Future for EmitFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.inner.is_none() {
            let latch = self.latch.clone();
            self.inner = Some(Box::pin(async move {
                latch.arrive_and_wait(1).await;
            }));
        }
        self.inner.as_mut().unwrap().as_mut().poll(cx)
    }
}

pub struct Subscription<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Awaits the next emitted value, consuming its delivery guard (and so
    /// counting down the emit's latch) the instant it is taken out.
    pub async fn next(&self) -> T {
        loop {
            if let Some((value, _guard)) = self.slot.pending.lock().take() {
                return value;
            }
            let _ = self.slot.cell.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Waker;

    #[test]
    fn subscribers_see_emitted_values() {
        let observable = Observable::<i32>::new();
        let sub = observable.subscribe();
        let _ = observable.emit(42);
        assert_eq!(sub.slot.pending.lock().as_ref().map(|(v, _)| *v), Some(42));
    }

    #[test]
    fn emit_latch_requires_every_subscriber_to_consume() {
        let observable = Observable::<i32>::new();
        let sub_a = observable.subscribe();
        let sub_b = observable.subscribe();
        let mut emitted = Box::pin(observable.emit(7));

        let waker = Waker::noop();
        let mut cx = Context::from_waker(waker);

        // The emitter's own arrival alone can't open the latch: two
        // subscriptions are still holding their delivery guards.
        assert_eq!(emitted.as_mut().poll(&mut cx), Poll::Pending);

        let _ = sub_a.slot.pending.lock().take();
        assert_eq!(emitted.as_mut().poll(&mut cx), Poll::Pending);

        let _ = sub_b.slot.pending.lock().take();
        // Every subscription live at emit time has now consumed its copy.
        assert_eq!(emitted.as_mut().poll(&mut cx), Poll::Ready(()));
    }

    #[test]
    fn subscriber_count_reflects_connect_and_disconnect() {
        let observable = Observable::<i32>::new();
        let count_before = AtomicUsize::new(observable.subscriber_count());
        assert_eq!(count_before.load(Ordering::Relaxed), 0);
        let sub = observable.subscribe();
        assert_eq!(observable.subscriber_count(), 1);
        observable.subscribers.lock().retain(|s| !Arc::ptr_eq(s, &sub.slot));
        assert_eq!(observable.subscriber_count(), 0);
    }
}
