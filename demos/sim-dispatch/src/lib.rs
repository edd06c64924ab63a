// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A small GPU model used to exercise the kernel dispatcher.
//!
//! The [`Simulation`](crate::sim::Simulation) connects a
//! [`Dispatcher`](hsa_dispatch::dispatcher::Dispatcher) to a compute fabric
//! with a fixed number of workgroup slots, a global scheduler that feeds it
//! kernels from a set of hardware queues, and host memory holding the
//! completion signals.

pub mod config;
pub mod fabric;
pub mod global;
pub mod host;
pub mod sim;
pub mod workload;
