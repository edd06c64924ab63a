// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! An event that can be triggered any number of times.
//!
//! A listener completes on the first notification after it was created,
//! with the value passed to [`notify_result`](Repeated::notify_result) or the
//! last value set. Notifications that happened before the listener was
//! created are not seen.

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::Future;
use futures::future::FusedFuture;

use crate::traits::{BoxFuture, Event};

struct RepeatedState<T> {
    /// Number of notifications so far.
    count: Cell<u64>,
    value: Cell<T>,
    waiting: RefCell<Vec<Waker>>,
}

#[derive(Clone)]
pub struct Repeated<T>
where
    T: Copy,
{
    state: Rc<RepeatedState<T>>,
}

impl<T> Repeated<T>
where
    T: Copy + 'static,
{
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            state: Rc::new(RepeatedState {
                count: Cell::new(0),
                value: Cell::new(value),
                waiting: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn notify(&self) {
        self.state.count.set(self.state.count.get() + 1);
        let waiting: Vec<Waker> = self.state.waiting.borrow_mut().drain(..).collect();
        for waker in waiting {
            waker.wake();
        }
    }

    pub fn notify_result(&self, value: T) {
        self.state.value.set(value);
        self.notify();
    }
}

impl Default for Repeated<()> {
    fn default() -> Self {
        Self::new(())
    }
}

impl<T> Event<T> for Repeated<T>
where
    T: Copy + 'static,
{
    fn listen(&self) -> BoxFuture<'static, T> {
        Box::pin(RepeatedFuture {
            state: self.state.clone(),
            seen: self.state.count.get(),
            done: false,
        })
    }

    fn clone_dyn(&self) -> Box<dyn Event<T>> {
        Box::new(self.clone())
    }
}

pub struct RepeatedFuture<T> {
    state: Rc<RepeatedState<T>>,
    seen: u64,
    done: bool,
}

impl<T> Future for RepeatedFuture<T>
where
    T: Copy,
{
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.state.count.get() != self.seen {
            self.done = true;
            Poll::Ready(self.state.value.get())
        } else {
            self.state.waiting.borrow_mut().push(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> FusedFuture for RepeatedFuture<T>
where
    T: Copy,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}
