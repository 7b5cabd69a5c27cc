use std::collections::BTreeMap;

use foundation::grid::{CellKey, GridMapper};
use foundation::math::Vec2;
use runtime::budget::SlotBudget;
use tracing::debug;

use crate::fetch::CancelToken;
use crate::lifecycle::LoadState;
use crate::queue::LoadQueue;
use crate::request::{ContentId, LoadRequest, Ticket, distance_priority};

#[derive(Debug)]
struct InFlight {
    cell: CellKey,
    content_id: ContentId,
    token: CancelToken,
}

/// A load that was granted a concurrency slot and must now be fetched.
#[derive(Debug, Clone)]
pub struct Admission {
    pub ticket: Ticket,
    pub request: LoadRequest,
    pub token: CancelToken,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The cell had no queued or admitted load.
    NotOutstanding,
    /// A queued request was dropped before admission.
    Dequeued,
    /// An admitted load's token was fired and its slot released.
    Signalled(Ticket),
}

/// An admitted load that has settled and released its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub ticket: Ticket,
    pub cell: CellKey,
    pub content_id: ContentId,
}

/// Admission control for cell loads.
///
/// Holds the priority queue of pending requests and the set of admitted
/// (in-flight) loads, and never lets more than `max_concurrent` be admitted
/// at once. Each admitted load carries a `CancelToken`; cancelling an
/// admitted load fires the token and releases its slot immediately, so a
/// slow or hung fetch can never leak capacity. The late completion of such
/// a load is recognised by its ticket and ignored.
#[derive(Debug)]
pub struct LoadScheduler {
    queue: LoadQueue,
    slots: SlotBudget,
    in_flight: BTreeMap<Ticket, InFlight>,
    by_cell: BTreeMap<CellKey, Ticket>,
    next_ticket: u64,
}

impl LoadScheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            queue: LoadQueue::new(),
            slots: SlotBudget::new(max_concurrent),
            in_flight: BTreeMap::new(),
            by_cell: BTreeMap::new(),
            next_ticket: 1,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.slots.max()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self, cell: &CellKey) -> Option<LoadState> {
        if self.by_cell.contains_key(cell) {
            Some(LoadState::Admitted)
        } else if self.queue.contains(cell) {
            Some(LoadState::Queued)
        } else {
            None
        }
    }

    pub fn is_outstanding(&self, cell: &CellKey) -> bool {
        self.state(cell).is_some()
    }

    /// Queues `req` unless its cell already has an outstanding load.
    pub fn enqueue(&mut self, req: LoadRequest) -> bool {
        if self.is_outstanding(&req.cell) {
            debug!(cell = %req.cell, "duplicate load request ignored");
            return false;
        }
        self.queue.push(req)
    }

    /// Admits the single best queued request if a slot is free.
    pub fn admit_next(&mut self) -> Option<Admission> {
        let request = self.queue.pop_next(&mut self.slots)?;
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let token = CancelToken::new();

        self.by_cell.insert(request.cell, ticket);
        self.in_flight.insert(
            ticket,
            InFlight {
                cell: request.cell,
                content_id: request.content_id.clone(),
                token: token.clone(),
            },
        );
        debug!(
            cell = %request.cell,
            content_id = %request.content_id,
            ticket = ticket.0,
            in_flight = self.in_flight.len(),
            "load admitted"
        );
        Some(Admission {
            ticket,
            request,
            token,
        })
    }

    /// Admits queued requests until the queue is empty or all slots are taken.
    pub fn admit(&mut self) -> Vec<Admission> {
        std::iter::from_fn(|| self.admit_next()).collect()
    }

    pub fn cancel(&mut self, cell: &CellKey) -> CancelOutcome {
        if self.queue.cancel(cell).is_some() {
            return CancelOutcome::Dequeued;
        }
        let Some(ticket) = self.by_cell.remove(cell) else {
            return CancelOutcome::NotOutstanding;
        };
        if let Some(flight) = self.in_flight.remove(&ticket) {
            flight.token.cancel();
            self.slots.release();
        }
        CancelOutcome::Signalled(ticket)
    }

    /// Releases the slot held by `ticket`.
    ///
    /// Returns `None` for tickets that are no longer in flight (already
    /// cancelled or settled); callers must treat those results as no-ops.
    pub fn settle(&mut self, ticket: Ticket) -> Option<Settled> {
        let Some(flight) = self.in_flight.remove(&ticket) else {
            debug!(ticket = ticket.0, "stale completion ignored");
            return None;
        };
        self.by_cell.remove(&flight.cell);
        self.slots.release();
        Some(Settled {
            ticket,
            cell: flight.cell,
            content_id: flight.content_id,
        })
    }

    /// Re-ranks queued requests by distance to `center`.
    pub fn reprioritize(&mut self, grid: &GridMapper, center: Vec2) {
        self.queue
            .reprioritize(|req| distance_priority(grid.cell_world_center(req.cell), center));
    }

    /// Drops every queued request and cancels every admitted load.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = self.queue.drain().len();
        for (_, flight) in std::mem::take(&mut self.in_flight) {
            flight.token.cancel();
            self.slots.release();
            cancelled += 1;
        }
        self.by_cell.clear();
        cancelled
    }
}
