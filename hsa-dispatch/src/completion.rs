// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Classification of workgroup completion reports.

use crate::config::{DispatcherConfig, NearCompletionMode};
use crate::task::KernelTask;

/// What a completion report means for its kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    InProgress,

    /// Enough of the kernel has completed that the global scheduler should
    /// be asked for more work.
    NearCompletion,

    /// Every workgroup of this chiplet's share has completed.
    Complete,
}

pub struct CompletionTracker {
    threshold: f64,
    mode: NearCompletionMode,
}

impl CompletionTracker {
    #[must_use]
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            threshold: config.threshold,
            mode: config.near_completion,
        }
    }

    /// The completed count at which a kernel of `total_wgs` is nearly done.
    #[must_use]
    pub fn near_threshold(&self, total_wgs: u32) -> u32 {
        (f64::from(total_wgs) * self.threshold) as u32
    }

    /// Classify a report that moved `task`'s completed count up from
    /// `previous`.
    ///
    /// Full completion takes precedence, so the near-completion milestone is
    /// never reported for the final workgroup. It is reported at most once
    /// per task and never for a threshold of zero workgroups.
    #[must_use]
    pub fn classify(&self, task: &KernelTask, previous: u32) -> Milestone {
        let completed = task.completed_wgs();
        if task.is_complete() {
            return Milestone::Complete;
        }
        if task.near_completion_notified() {
            return Milestone::InProgress;
        }

        let threshold = self.near_threshold(task.total_wgs());
        if threshold == 0 {
            return Milestone::InProgress;
        }
        let reached = match self.mode {
            NearCompletionMode::Exact => completed == threshold,
            NearCompletionMode::Crossing => previous < threshold && threshold <= completed,
        };
        if reached {
            Milestone::NearCompletion
        } else {
            Milestone::InProgress
        }
    }

    /// True if the next workgroup to complete will be the kernel's last.
    #[must_use]
    pub fn is_reaching_end(task: &KernelTask) -> bool {
        task.completed_wgs() + 1 == task.total_wgs()
    }
}
