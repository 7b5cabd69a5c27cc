use foundation::grid::CellKey;
use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DwellStatus {
    Idle,
    /// Linear progress in `[0, 1)`.
    Progress { cell: CellKey, progress: f32 },
    /// The pointer stayed for the full duration. Reported once.
    Commit(CellKey),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Active {
    cell: CellKey,
    since: Millis,
}

/// Dwell-to-commit timer for the cell under the pointer.
///
/// Tracks at most one cell. Entering a different cell restarts the timer;
/// entering the same cell again keeps it running. A committed cell cannot
/// start another dwell until the pointer leaves it.
#[derive(Debug, Clone)]
pub struct DwellTracker {
    duration_ms: u64,
    active: Option<Active>,
    committed: Option<CellKey>,
}

impl DwellTracker {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            active: None,
            committed: None,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn active_cell(&self) -> Option<CellKey> {
        self.active.map(|a| a.cell)
    }

    /// Returns `true` if a new dwell started.
    pub fn enter(&mut self, cell: CellKey, now: Millis) -> bool {
        if self.active_cell() == Some(cell) || self.committed == Some(cell) {
            return false;
        }
        self.committed = None;
        self.active = Some(Active { cell, since: now });
        true
    }

    /// Stops tracking; returns the cell whose dwell was abandoned.
    pub fn leave(&mut self) -> Option<CellKey> {
        self.committed = None;
        self.active.take().map(|a| a.cell)
    }

    pub fn tick(&mut self, now: Millis) -> DwellStatus {
        let Some(active) = self.active else {
            return DwellStatus::Idle;
        };
        let elapsed = now.saturating_since(active.since);
        if elapsed >= self.duration_ms {
            self.active = None;
            self.committed = Some(active.cell);
            return DwellStatus::Commit(active.cell);
        }
        DwellStatus::Progress {
            cell: active.cell,
            progress: elapsed as f32 / self.duration_ms as f32,
        }
    }
}
