// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Cache hazard decisions made before a kernel may start dispatching.
//!
//! A kernel may need caches invalidated before it starts (acquire) and dirty
//! data written back (release). Both are resolved asynchronously by the
//! memory system, so the gate only decides what still needs requesting and
//! whether the task is clear to go. Applying the decision is left to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) so that no task state is
//! borrowed while the fabric is called.

use crate::task::KernelTask;
use crate::traits::{ComputeFabric, GlobalScheduler};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidateStep {
    /// Ask the fabric to invalidate, flushing as well if `flush` is set.
    Request { flush: bool },

    /// The fabric does not need an invalidate before launch.
    NotRequired,

    /// Already requested (or skipped) on an earlier attempt.
    AlreadyStarted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritebackStep {
    Request,
    NotRequired,
    AlreadyStarted,

    /// The fabric releases at kernel end so writebacks are never waited on.
    ReleasedAtEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HazardPlan {
    pub invalidate: InvalidateStep,
    pub writeback: WritebackStep,
}

pub struct HazardGate<'a> {
    fabric: &'a dyn ComputeFabric,
    scheduler: &'a dyn GlobalScheduler,
    chiplet: u32,
}

impl<'a> HazardGate<'a> {
    #[must_use]
    pub fn new(
        fabric: &'a dyn ComputeFabric,
        scheduler: &'a dyn GlobalScheduler,
        chiplet: u32,
    ) -> Self {
        Self {
            fabric,
            scheduler,
            chiplet,
        }
    }

    /// Decide which hazard requests `task` still needs.
    ///
    /// Each hazard is requested at most once per task. Later attempts only
    /// wait for the outstanding requests to resolve.
    #[must_use]
    pub fn plan(&self, task: &KernelTask) -> HazardPlan {
        let invalidate = if task.inv_started() {
            InvalidateStep::AlreadyStarted
        } else if self.fabric.requires_acquire_invalidate() {
            InvalidateStep::Request {
                flush: self.flush_required(task, true),
            }
        } else {
            InvalidateStep::NotRequired
        };

        let writeback = if self.fabric.releases_at_kernel_end() {
            WritebackStep::ReleasedAtEnd
        } else if task.wb_started() {
            WritebackStep::AlreadyStarted
        } else if self.flush_required(task, false) {
            WritebackStep::Request
        } else {
            WritebackStep::NotRequired
        };

        HazardPlan {
            invalidate,
            writeback,
        }
    }

    /// Whether `task` may start issuing workgroups.
    #[must_use]
    pub fn is_ready(&self, task: &KernelTask) -> bool {
        task.is_inv_done()
            && (self.fabric.releases_at_kernel_end() || task.is_wb_done())
            && self
                .scheduler
                .cross_chiplet_flush_done(task.global_kernel_id(), task.global_queue_id())
    }

    fn flush_required(&self, task: &KernelTask, invalidate: bool) -> bool {
        self.scheduler.flush_required(
            self.chiplet,
            task.global_kernel_id(),
            task.global_queue_id(),
            invalidate,
        )
    }
}
