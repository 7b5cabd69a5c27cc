/// Lifecycle of one load request.
///
/// `Queued -> Admitted -> (Succeeded | Failed | Cancelled)`; a queued request
/// can also go straight to `Cancelled`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadState {
    Queued,
    Admitted,
    Succeeded,
    Failed,
    Cancelled,
}

impl LoadState {
    /// Queued or admitted: the cell already has a load and must not get another.
    pub fn is_outstanding(self) -> bool {
        matches!(self, LoadState::Queued | LoadState::Admitted)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_outstanding()
    }

    /// Counter a load is tallied under once it reaches this state.
    pub fn metric_name(self) -> &'static str {
        match self {
            LoadState::Queued => "loads.queued",
            LoadState::Admitted => "loads.admitted",
            LoadState::Succeeded => "loads.succeeded",
            LoadState::Failed => "loads.failed",
            LoadState::Cancelled => "loads.cancelled",
        }
    }
}
