// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulation time.
//!
//! Time advances in [`Tick`]s. One tick is one picosecond so that clocks of
//! most practical frequencies have an integral period.

pub mod clock;
pub mod simtime;

/// The unit of simulated time.
pub type Tick = u64;

/// The number of [`Tick`]s in one nanosecond.
pub const TICKS_PER_NS: Tick = 1000;

/// Convert a number of [`Tick`]s to a time in `ns`.
#[must_use]
pub fn ticks_to_ns(ticks: Tick) -> f64 {
    ticks as f64 / TICKS_PER_NS as f64
}
