// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Saved dispatcher state.

use hsa_engine::time::Tick;
use serde::{Deserialize, Serialize};

use crate::task::{DispatchId, KernelTask};

/// Everything needed to resume a dispatcher.
///
/// Produced by [`Dispatcher::checkpoint`](crate::dispatcher::Dispatcher::checkpoint)
/// and consumed by [`Dispatcher::restore`](crate::dispatcher::Dispatcher::restore).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherCheckpoint {
    /// Time of the pending dispatch tick, if one was armed.
    pub tick: Option<Tick>,

    /// Every live task.
    pub tasks: Vec<KernelTask>,

    /// Dispatch ids waiting in the ready queue, in the order they would be
    /// attempted.
    pub queue: Vec<DispatchId>,
}
