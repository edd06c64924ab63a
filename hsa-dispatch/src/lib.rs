// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Kernel dispatch for a GPU timing model.
//!
//! The [`Dispatcher`](crate::dispatcher::Dispatcher) takes kernel launches
//! from the host and decides, tick by tick, when their workgroups are issued
//! to the [compute fabric](crate::traits::ComputeFabric). Before a kernel can
//! start, any cache invalidate or writeback it needs must have been resolved
//! by the memory system. Kernels that are blocked, or that find no room on
//! the fabric, are retried on a later tick without holding up other kernels.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use hsa_dispatch::config::DispatcherConfig;
//! use hsa_dispatch::dispatcher::Dispatcher;
//! use hsa_dispatch::task::{DispatchId, KernelTask, PacketRef, WavefrontContext};
//! use hsa_dispatch::test_helpers::{MockFabric, MockHost, MockScheduler};
//! use hsa_engine::engine::Engine;
//!
//! let mut engine = Engine::default();
//! let fabric = Rc::new(MockFabric::default());
//! let host = Rc::new(MockHost::default());
//! let scheduler = Rc::new(MockScheduler::default());
//! let top = engine.top().clone();
//! let dispatcher = Dispatcher::new_and_register_with_scheduler(
//!     &engine,
//!     &top,
//!     "dispatcher",
//!     DispatcherConfig::default(),
//!     fabric.clone(),
//!     host.clone(),
//!     scheduler,
//! )
//! .unwrap();
//!
//! let id = DispatchId(1);
//! dispatcher.submit(KernelTask::new(id, "vector_add", 2).with_packet(PacketRef(0x100)));
//! engine.run().unwrap();
//! assert_eq!(fabric.dispatched(id), 2);
//!
//! dispatcher.notify_wg_completed(&WavefrontContext::new(id, 0));
//! dispatcher.notify_wg_completed(&WavefrontContext::new(id, 1));
//! engine.run().unwrap();
//! assert_eq!(host.finalized(), vec![(PacketRef(0x100), 0)]);
//! assert!(!dispatcher.is_live(id));
//! ```

pub mod checkpoint;
pub mod completion;
pub mod config;
pub mod dispatcher;
pub mod hazard;
pub mod ready_queue;
pub mod stats;
pub mod table;
pub mod task;
pub mod test_helpers;
pub mod traits;
