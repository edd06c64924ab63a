// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Discrete event simulation engine.
//!
//! This library provides the core of the [Engine](crate::engine::Engine)
//! which executes event driven asynchronous components on a single simulated
//! timeline. Time is measured in [ticks](crate::time::Tick) of one picosecond
//! and [clocks](crate::time::clock) let a task wait for a number of their
//! cycles.
//!
//! Components are futures. They are either spawned directly or
//! [registered](crate::engine::Engine::register) as a
//! [`Runnable`](crate::traits::Runnable) so that their `run()` is spawned
//! when the simulation starts. Tasks wake each other through
//! [events](crate::events).
//!
//! # Simple Application
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use hsa_engine::engine::Engine;
//! use hsa_engine::run_simulation;
//!
//! let mut engine = Engine::default();
//! let fired = Rc::new(Cell::new(0));
//! let clock = engine.default_clock();
//! {
//!     let fired = fired.clone();
//!     engine.spawn(async move {
//!         clock.wait_ticks(10).await;
//!         fired.set(fired.get() + 1);
//!         Ok(())
//!     });
//! }
//! run_simulation!(engine);
//! assert_eq!(fired.get(), 1);
//! assert_eq!(engine.time_now_ns(), 10.0);
//! ```

pub mod engine;
pub mod events;
pub mod executor;
pub mod stats;
pub mod test_helpers;
pub mod time;
pub mod traits;
pub mod types;

#[macro_export]
/// Run the simulation, checking that it succeeds or fails with `$expect`.
macro_rules! run_simulation {
    ($engine:ident) => {
        $engine.run().unwrap();
    };
    ($engine:ident, $expect:expr) => {
        match $engine.run() {
            Ok(()) => panic!("Expected an error!"),
            Err(e) => assert_eq!(format!("{e}").as_str(), $expect),
        }
    };
}
