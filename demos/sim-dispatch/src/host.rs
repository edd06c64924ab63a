// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Host memory holding completion signals, and the packet processor that
//! retires kernel launch packets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use hsa_dispatch::task::{PacketRef, SignalHandle};
use hsa_dispatch::traits::HostSync;
use hsa_engine::stats::{Counter, dump};
use hsa_track::entity::Entity;
use hsa_track::{debug, trace};

pub struct ModelHost {
    pub entity: Rc<Entity>,
    signals: RefCell<HashMap<SignalHandle, i64>>,
    pub packets_finalized: Counter,
    pub signal_writes: Counter,
}

impl ModelHost {
    #[must_use]
    pub fn new_and_register(parent: &Rc<Entity>, name: &str) -> Rc<Self> {
        Rc::new(Self {
            entity: Rc::new(Entity::new(parent, name)),
            signals: RefCell::new(HashMap::new()),
            packets_finalized: Counter::new("packets_finalized", "kernel packets retired"),
            signal_writes: Counter::new("signal_writes", "completion signal updates"),
        })
    }

    pub fn set_signal(&self, signal: SignalHandle, value: i64) {
        self.signals.borrow_mut().insert(signal, value);
    }

    /// Current value of `signal`. Signals never written read as zero.
    #[must_use]
    pub fn signal(&self, signal: SignalHandle) -> i64 {
        self.signals.borrow().get(&signal).copied().unwrap_or(0)
    }

    pub fn prepare(&self) {
        self.packets_finalized.prepare();
        self.signal_writes.prepare();
    }

    pub fn dump<W: fmt::Write>(&self, out: &mut W, prefix: &str) -> fmt::Result {
        dump(out, prefix, &[&self.packets_finalized, &self.signal_writes])
    }
}

impl HostSync for ModelHost {
    fn finalize_packet(&self, packet: PacketRef, queue_id: u32) {
        debug!(self.entity ; "queue {queue_id}: retire packet {:#x}", packet.0);
        self.packets_finalized.inc();
    }

    fn read_signal(&self, signal: SignalHandle) -> i64 {
        self.signal(signal)
    }

    fn write_signal(&self, signal: SignalHandle, value: i64) {
        trace!(self.entity ; "signal {signal} = {value}");
        self.signal_writes.inc();
        self.set_signal(signal, value);
    }
}
