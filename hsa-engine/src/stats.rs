// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Statistics counters.
//!
//! A [`Counter`] is a named, monotonically managed count owned by a single
//! component. Counters are read at the end of a simulation (or at any point
//! in between) and can be dumped in a simple `name value # description`
//! format.

use std::cell::Cell;
use std::fmt;

pub struct Counter {
    name: &'static str,
    desc: &'static str,
    value: Cell<u64>,
    reported: Cell<u64>,
}

impl Counter {
    #[must_use]
    pub const fn new(name: &'static str, desc: &'static str) -> Self {
        Self {
            name,
            desc,
            value: Cell::new(0),
            reported: Cell::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn desc(&self) -> &'static str {
        self.desc
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.value.set(self.value.get() + n);
    }

    /// Decrement the counter. Counting below zero is a bug in the owner.
    pub fn dec(&self) {
        let value = self.value.get();
        assert!(value > 0, "Counter '{}' decremented below zero", self.name);
        self.value.set(value - 1);
    }

    pub fn set(&self, value: u64) {
        self.value.set(value);
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.value.get()
    }

    pub fn reset(&self) {
        self.value.set(0);
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.get() == 0
    }

    /// Latch the current value as the one to report. Does not change the
    /// live value.
    pub fn prepare(&self) {
        self.reported.set(self.value.get());
    }

    /// The value latched by the last [`prepare`](Counter::prepare).
    #[must_use]
    pub fn reported(&self) -> u64 {
        self.reported.get()
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<40} {:>12} # {}", self.name, self.value.get(), self.desc)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value.get())
    }
}

/// Write a group of counters under a common prefix.
pub fn dump<W: fmt::Write>(out: &mut W, prefix: &str, counters: &[&Counter]) -> fmt::Result {
    for counter in counters {
        writeln!(
            out,
            "{:<40} {:>12} # {}",
            format!("{prefix}.{}", counter.name),
            counter.value(),
            counter.desc
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting() {
        let c = Counter::new("launched", "Number of kernels launched");
        assert!(c.is_zero());
        c.inc();
        c.add(4);
        c.dec();
        assert_eq!(c.value(), 4);
        c.set(10);
        assert_eq!(c.value(), 10);
        c.prepare();
        assert_eq!(c.value(), 10);
        assert_eq!(c.reported(), 10);
        c.reset();
        assert!(c.is_zero());
        assert_eq!(c.reported(), 10);
    }

    #[test]
    #[should_panic(expected = "decremented below zero")]
    fn underflow() {
        let c = Counter::new("c", "");
        c.dec();
    }

    #[test]
    fn dump_format() {
        let a = Counter::new("a", "first");
        let b = Counter::new("b", "second");
        b.add(3);
        let mut out = String::new();
        dump(&mut out, "disp", &[&a, &b]).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("disp.a"));
        assert!(lines[1].contains(" 3 # second"));
    }
}
