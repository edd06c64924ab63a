// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fmt;

use hsa_engine::stats::{Counter, dump};

pub struct DispatcherStats {
    pub num_kernels_launched: Counter,
    pub cycles_waiting_for_dispatch: Counter,
}

impl DispatcherStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            num_kernels_launched: Counter::new(
                "num_kernels_launched",
                "number of kernels launched",
            ),
            cycles_waiting_for_dispatch: Counter::new(
                "cycles_waiting_for_dispatch",
                "number of cycles with outstanding kernels waiting to be dispatched",
            ),
        }
    }

    fn counters(&self) -> [&Counter; 2] {
        [&self.num_kernels_launched, &self.cycles_waiting_for_dispatch]
    }

    /// Latch every counter ready for reporting.
    pub fn prepare(&self) {
        for counter in self.counters() {
            counter.prepare();
        }
    }

    pub fn reset(&self) {
        for counter in self.counters() {
            counter.reset();
        }
    }

    pub fn dump<W: fmt::Write>(&self, out: &mut W, prefix: &str) -> fmt::Result {
        dump(out, prefix, &self.counters())
    }
}

impl Default for DispatcherStats {
    fn default() -> Self {
        Self::new()
    }
}
