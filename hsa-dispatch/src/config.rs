// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration of a [`Dispatcher`](crate::dispatcher::Dispatcher).

use hsa_engine::sim_error;
use hsa_engine::types::SimResult;
use serde::{Deserialize, Serialize};

/// Device id of the first GPU in a multi-chiplet system.
pub const STARTING_GPU_ID: u32 = 2765;

/// How tasks of equal priority are ordered in the ready queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Earliest submitted first.
    #[default]
    Fifo,

    /// Most recently submitted first.
    Lifo,
}

/// When the "almost done" notification is sent to the global scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearCompletionMode {
    /// Only when the completed count lands exactly on the threshold. A
    /// batched report that jumps over the threshold sends nothing.
    #[default]
    Exact,

    /// When a report takes the completed count from below the threshold to
    /// at or above it.
    Crossing,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Fraction of a kernel's workgroups that must complete before the
    /// global scheduler is asked for more work.
    pub threshold: f64,

    pub gpu_id: u32,
    pub starting_gpu_id: u32,

    /// The chiplet responsible for decrementing a kernel's completion signal.
    pub completion_owner_chiplet: u32,

    pub tie_break: TieBreak,
    pub near_completion: NearCompletionMode,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            gpu_id: STARTING_GPU_ID,
            starting_gpu_id: STARTING_GPU_ID,
            completion_owner_chiplet: 1,
            tie_break: TieBreak::default(),
            near_completion: NearCompletionMode::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> SimResult {
        if !(0.0..=1.0).contains(&self.threshold) {
            return sim_error!(format!(
                "threshold {} must be between 0.0 and 1.0",
                self.threshold
            ));
        }
        if self.gpu_id < self.starting_gpu_id {
            return sim_error!(format!(
                "gpu_id {} is below starting_gpu_id {}",
                self.gpu_id, self.starting_gpu_id
            ));
        }
        Ok(())
    }

    /// Position of this device among the chiplets.
    #[must_use]
    pub fn chiplet_offset(&self) -> u32 {
        self.gpu_id.saturating_sub(self.starting_gpu_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DispatcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chiplet_offset(), 0);
    }

    #[test]
    fn threshold_range() {
        let config = DispatcherConfig {
            threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DispatcherConfig {
            threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn chiplet_offset() {
        let config = DispatcherConfig {
            gpu_id: STARTING_GPU_ID + 3,
            ..Default::default()
        };
        assert_eq!(config.chiplet_offset(), 3);

        let config = DispatcherConfig {
            gpu_id: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
