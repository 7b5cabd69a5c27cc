//! Priority work queue with cancellation.
//!
//! Key properties:
//! - Higher priority values run first (floats, totally ordered via `StableF64`).
//! - Equal priorities are processed in insertion order.
//! - Cancellation removes an item without disturbing the order of the rest.
//! - Optional admission gating via a `SlotBudget`.
//!
//! Vec-backed with a linear scan on pop: queues here hold one screenful of
//! work, so simplicity wins over a heap that would need lazy deletion.

use core::cmp::Ordering;

use foundation::math::StableF64;

use crate::budget::SlotBudget;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Key {
    priority: StableF64,
    id: WorkId,
}

impl Ord for Key {
    // `Greater` runs earlier: higher priority, then older id.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Item<T> {
    key: Key,
    payload: T,
}

#[derive(Debug)]
pub struct WorkQueue<T> {
    next_id: u64,
    items: Vec<Item<T>>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            items: Vec::new(),
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, priority: f64, payload: T) -> WorkId {
        let id = WorkId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.items.push(Item {
            key: Key {
                priority: StableF64(priority),
                id,
            },
            payload,
        });
        id
    }

    /// Removes a pending item, returning its payload.
    pub fn cancel(&mut self, id: WorkId) -> Option<T> {
        let idx = self.items.iter().position(|i| i.key.id == id)?;
        Some(self.items.swap_remove(idx).payload)
    }

    pub fn get(&self, id: WorkId) -> Option<&T> {
        self.items
            .iter()
            .find(|i| i.key.id == id)
            .map(|i| &i.payload)
    }

    /// Recomputes every pending item's priority. Insertion order is kept as
    /// the tie-break.
    pub fn reprioritize(&mut self, mut priority_of: impl FnMut(&T) -> f64) {
        for item in &mut self.items {
            item.key.priority = StableF64(priority_of(&item.payload));
        }
    }

    fn best_index(&self) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.key.cmp(&b.key))
            .map(|(idx, _)| idx)
    }

    /// Pops the next (highest priority, then oldest) item.
    pub fn pop_next(&mut self) -> Option<(WorkId, f64, T)> {
        let idx = self.best_index()?;
        let item = self.items.swap_remove(idx);
        Some((item.key.id, item.key.priority.0, item.payload))
    }

    /// Pops the next item only if a slot can be taken for it.
    ///
    /// On success the slot stays held; the caller releases it when the work
    /// settles.
    pub fn pop_next_with_slots(&mut self, slots: &mut SlotBudget) -> Option<(WorkId, f64, T)> {
        if self.is_empty() || !slots.try_acquire() {
            return None;
        }
        self.pop_next()
    }
}
