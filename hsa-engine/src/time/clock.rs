// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A clock converts between cycles and simulated [`Tick`]s and lets tasks
//! wait for a number of its cycles to pass.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::events::EventPriority;
use crate::sim_error;
use crate::time::simtime::{SimTime, WakeKey};
use crate::time::{TICKS_PER_NS, Tick};
use crate::types::SimError;

/// The number of [`Tick`]s in one microsecond, used to derive a period from a
/// frequency in MHz.
const TICKS_PER_US: f64 = (TICKS_PER_NS * 1000) as f64;

/// Length of one cycle of a clock running at `freq_mhz`.
///
/// The period is rounded to the nearest tick and must be at least one tick
/// long.
pub fn period_of(freq_mhz: f64) -> Result<Tick, SimError> {
    if !freq_mhz.is_finite() || freq_mhz <= 0.0 {
        return sim_error!(format!("Invalid clock frequency {freq_mhz}MHz"));
    }
    let period = (TICKS_PER_US / freq_mhz).round() as Tick;
    if period == 0 {
        return sim_error!(format!(
            "Clock frequency {freq_mhz}MHz is too fast for tick resolution"
        ));
    }
    Ok(period)
}

#[derive(Clone)]
/// State representing a clock.
pub struct Clock {
    /// Frequency of the clock in MHz.
    freq_mhz: f64,

    /// Period of the clock in ticks.
    period: Tick,

    time: Rc<SimTime>,
}

impl Clock {
    /// Create a new [Clock] at the specified frequency on the given
    /// timeline. Clocks are normally obtained from the
    /// [`Engine`](crate::engine::Engine).
    pub fn new(freq_mhz: f64, time: &Rc<SimTime>) -> Result<Self, SimError> {
        Ok(Self {
            freq_mhz,
            period: period_of(freq_mhz)?,
            time: time.clone(),
        })
    }

    pub(crate) fn one_ghz(time: &Rc<SimTime>) -> Self {
        Self {
            freq_mhz: 1000.0,
            period: TICKS_PER_NS,
            time: time.clone(),
        }
    }

    /// Returns the clocks frequency in MHz.
    #[must_use]
    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }

    /// Returns the length of one clock cycle in ticks.
    #[must_use]
    pub fn period(&self) -> Tick {
        self.period
    }

    /// Convert a number of cycles of this clock into ticks.
    #[must_use]
    pub fn cycles(&self, num_cycles: u64) -> Tick {
        num_cycles * self.period
    }

    /// Returns the number of whole cycles of this clock that have elapsed at
    /// the given time.
    #[must_use]
    pub fn cycle_at(&self, tick: Tick) -> u64 {
        tick / self.period
    }

    /// Returns the first clock edge at or after `tick`.
    #[must_use]
    pub fn edge_at_or_after(&self, tick: Tick) -> Tick {
        tick.div_ceil(self.period) * self.period
    }

    #[must_use]
    pub fn tick_now(&self) -> Tick {
        self.time.tick_now()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.time.time_now_ns()
    }

    /// Returns a [ClockDelay] future which must be `await`ed to delay the
    /// specified number of cycles.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks(&self, cycles: u64) -> ClockDelay {
        self.wait_until(self.tick_now() + self.cycles(cycles), EventPriority::DEFAULT)
    }

    /// Wait a number of cycles and then run behind any task woken at the
    /// same time with a lower `priority`.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks_with(&self, cycles: u64, priority: EventPriority) -> ClockDelay {
        self.wait_until(self.tick_now() + self.cycles(cycles), priority)
    }

    /// Wait until the absolute time `tick`, which must not be in the past.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_until(&self, tick: Tick, priority: EventPriority) -> ClockDelay {
        ClockDelay {
            time: self.time.clone(),
            until: (tick, priority),
            sleeping: None,
        }
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("freq_mhz", &self.freq_mhz)
            .field("period", &self.period)
            .finish()
    }
}

/// Two clocks are equal if they run at the same frequency.
impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        self.period == other.period
    }
}

/// Future returned by the clock to manage advancing time using async functions.
///
/// Dropping the future before it completes withdraws the wake-up.
pub struct ClockDelay {
    time: Rc<SimTime>,
    until: WakeKey,

    /// Id of the wake-up once it has been registered.
    sleeping: Option<u64>,
}

impl ClockDelay {
    /// The time this delay completes at.
    #[must_use]
    pub fn until(&self) -> Tick {
        self.until.0
    }
}

impl Future for ClockDelay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.sleeping {
            None => {
                let id = self.time.sleep(self.until, cx.waker().clone());
                self.sleeping = Some(id);
                Poll::Pending
            }
            Some(_) if self.time.has_reached(self.until) => {
                self.sleeping = None;
                Poll::Ready(())
            }
            Some(_) => Poll::Pending,
        }
    }
}

impl Drop for ClockDelay {
    fn drop(&mut self) {
        if let Some(id) = self.sleeping {
            self.time.cancel(self.until, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods() {
        assert_eq!(period_of(1000.0), Ok(1000));
        assert_eq!(period_of(0.5), Ok(2_000_000));
        assert_eq!(period_of(1800.0), Ok(556));
    }

    #[test]
    fn invalid_frequencies() {
        assert!(period_of(0.0).is_err());
        assert!(period_of(-5.0).is_err());
        assert!(period_of(f64::NAN).is_err());
        assert!(period_of(1e12).is_err());
    }
}
