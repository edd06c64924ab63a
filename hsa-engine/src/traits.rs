// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Traits shared by the engine and the components it runs.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::types::SimResult;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Something that can be waited on from `async` code.
///
/// ```rust
/// use hsa_engine::events::once::Once;
/// use hsa_engine::traits::Event;
///
/// let started = Once::default();
/// let waiter = started.listen();
/// started.notify().unwrap();
/// # drop(waiter);
/// ```
pub trait Event<T> {
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    fn listen(&self) -> BoxFuture<'static, T>;

    /// Clone behind a `Box` so that lists of events can be copied.
    fn clone_dyn(&self) -> Box<dyn Event<T>>;
}

impl<T> Clone for Box<dyn Event<T>> {
    fn clone(&self) -> Box<dyn Event<T>> {
        self.clone_dyn()
    }
}

/// A component that takes part in the simulation.
///
/// Components registered with the [`Engine`](crate::engine::Engine) have their
/// `run()` spawned when the simulation starts. A component that only reacts
/// to calls from other components can rely on the default, which returns
/// straight away.
#[async_trait(?Send)]
pub trait Runnable {
    async fn run(&self) -> SimResult {
        Ok(())
    }
}
