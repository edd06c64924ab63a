// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Storage for the live kernel tasks.
//!
//! Tasks are held in a slot arena. A [`TaskSlot`] carries the generation of
//! the slot at the time the task was inserted so that a stale slot (one whose
//! task has since been retired and the slot reused) is never mistaken for the
//! new occupant.

use std::collections::HashMap;

use crate::task::{DispatchId, KernelTask};

/// Stable handle to a task in a [`TaskTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskSlot {
    index: usize,
    generation: u32,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    task: Option<KernelTask>,
}

#[derive(Default)]
pub struct TaskTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_id: HashMap<DispatchId, TaskSlot>,
}

impl TaskTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task, reusing a free slot if there is one.
    ///
    /// Panics if a task with the same dispatch id is already live.
    pub fn insert(&mut self, task: KernelTask) -> TaskSlot {
        let id = task.dispatch_id();
        assert!(
            !self.by_id.contains_key(&id),
            "kernel {id} submitted while already live"
        );

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.task = Some(task);
        let handle = TaskSlot {
            index,
            generation: slot.generation,
        };
        self.by_id.insert(id, handle);
        handle
    }

    /// Remove a task, freeing its slot for reuse.
    pub fn remove(&mut self, id: DispatchId) -> Option<KernelTask> {
        let handle = self.by_id.remove(&id)?;
        let slot = &mut self.slots[handle.index];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        slot.task.take()
    }

    #[must_use]
    pub fn slot_of(&self, id: DispatchId) -> Option<TaskSlot> {
        self.by_id.get(&id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: DispatchId) -> bool {
        self.by_id.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: DispatchId) -> Option<&KernelTask> {
        let handle = self.slot_of(id)?;
        self.get_slot(handle)
    }

    pub fn get_mut(&mut self, id: DispatchId) -> Option<&mut KernelTask> {
        let handle = self.slot_of(id)?;
        self.get_slot_mut(handle)
    }

    #[must_use]
    pub fn get_slot(&self, handle: TaskSlot) -> Option<&KernelTask> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.task.as_ref()
    }

    pub fn get_slot_mut(&mut self, handle: TaskSlot) -> Option<&mut KernelTask> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.task.as_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The number of slots allocated, live or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live tasks in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &KernelTask> {
        self.slots.iter().filter_map(|slot| slot.task.as_ref())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.by_id.clear();
    }
}
