use std::collections::BTreeMap;

use foundation::grid::CellKey;
use runtime::budget::SlotBudget;
use runtime::work_queue::{WorkId, WorkQueue};

use crate::request::LoadRequest;

/// Pending loads, at most one per cell.
///
/// This is a thin wrapper over `runtime::WorkQueue` that adds the per-cell
/// index needed to reject duplicates and to cancel by cell.
#[derive(Debug, Default)]
pub struct LoadQueue {
    inner: WorkQueue<LoadRequest>,
    by_cell: BTreeMap<CellKey, WorkId>,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, cell: &CellKey) -> bool {
        self.by_cell.contains_key(cell)
    }

    pub fn get(&self, cell: &CellKey) -> Option<&LoadRequest> {
        let id = self.by_cell.get(cell)?;
        self.inner.get(*id)
    }

    /// Queues `req`. Returns `false` (and drops `req`) if its cell already has
    /// a queued request.
    pub fn push(&mut self, req: LoadRequest) -> bool {
        if self.by_cell.contains_key(&req.cell) {
            return false;
        }
        let cell = req.cell;
        let id = self.inner.push(req.priority, req);
        self.by_cell.insert(cell, id);
        true
    }

    pub fn cancel(&mut self, cell: &CellKey) -> Option<LoadRequest> {
        let id = self.by_cell.remove(cell)?;
        self.inner.cancel(id)
    }

    /// Pops the best request if a slot is available; the slot stays held.
    pub fn pop_next(&mut self, slots: &mut SlotBudget) -> Option<LoadRequest> {
        let (_id, priority, mut req) = self.inner.pop_next_with_slots(slots)?;
        self.by_cell.remove(&req.cell);
        req.priority = priority;
        Some(req)
    }

    pub fn reprioritize(&mut self, priority_of: impl Fn(&LoadRequest) -> f64) {
        self.inner.reprioritize(priority_of);
    }

    pub fn drain(&mut self) -> Vec<LoadRequest> {
        let mut out = Vec::with_capacity(self.len());
        while let Some((_, _, req)) = self.inner.pop_next() {
            out.push(req);
        }
        self.by_cell.clear();
        out
    }
}
