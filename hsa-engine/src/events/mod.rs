// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Events that tasks can wait on.
//!
//! [`Once`](once::Once) and [`Repeated`](repeated::Repeated) are triggered
//! by other tasks. Waiting for simulated time is done through a
//! [`Clock`](crate::time::clock::Clock), which takes an [`EventPriority`] to
//! order tasks that wake at the same [`Tick`].
//!
//! [`Tick`]: crate::time::Tick

pub mod once;
pub mod repeated;

/// Ordering of tasks that wake at the same [`Tick`].
///
/// Tasks with a lower priority value run first. Tasks with the same time and
/// priority run in the order they started waiting.
///
/// [`Tick`]: crate::time::Tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventPriority(pub i32);

impl EventPriority {
    /// Run before anything else in the tick.
    pub const MINIMUM: EventPriority = EventPriority(i32::MIN);

    /// The priority used by most events.
    pub const DEFAULT: EventPriority = EventPriority(0);

    /// Processor-style tick events run after default events in the same tick
    /// so that they observe the state left by memory responses.
    pub const CPU_TICK: EventPriority = EventPriority(50);

    /// Run after anything else in the tick.
    pub const MAXIMUM: EventPriority = EventPriority(i32::MAX);
}

impl std::fmt::Display for EventPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
