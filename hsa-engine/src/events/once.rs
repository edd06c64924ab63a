// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! An event that can only be triggered once.
//!
//! Listeners that arrive after the trigger complete immediately with the
//! event's value.

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::Future;
use futures::future::FusedFuture;

use crate::sim_error;
use crate::traits::{BoxFuture, Event};
use crate::types::SimResult;

struct OnceState<T> {
    triggered: Cell<bool>,
    value: T,
    waiting: RefCell<Vec<Waker>>,
}

#[derive(Clone)]
pub struct Once<T>
where
    T: Copy,
{
    state: Rc<OnceState<T>>,
}

impl<T> Once<T>
where
    T: Copy + 'static,
{
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            state: Rc::new(OnceState {
                triggered: Cell::new(false),
                value,
                waiting: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn triggered(&self) -> bool {
        self.state.triggered.get()
    }

    /// Trigger the event, releasing every listener.
    pub fn notify(&self) -> SimResult {
        if self.state.triggered.replace(true) {
            return sim_error!("once event already triggered");
        }
        let waiting: Vec<Waker> = self.state.waiting.borrow_mut().drain(..).collect();
        for waker in waiting {
            waker.wake();
        }
        Ok(())
    }
}

impl Default for Once<()> {
    fn default() -> Self {
        Self::new(())
    }
}

impl<T> Event<T> for Once<T>
where
    T: Copy + 'static,
{
    fn listen(&self) -> BoxFuture<'static, T> {
        Box::pin(OnceFuture {
            state: self.state.clone(),
            done: false,
        })
    }

    fn clone_dyn(&self) -> Box<dyn Event<T>> {
        Box::new(self.clone())
    }
}

pub struct OnceFuture<T> {
    state: Rc<OnceState<T>>,
    done: bool,
}

impl<T> Future for OnceFuture<T>
where
    T: Copy,
{
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.state.triggered.get() {
            self.done = true;
            Poll::Ready(self.state.value)
        } else {
            self.state.waiting.borrow_mut().push(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> FusedFuture for OnceFuture<T>
where
    T: Copy,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}
