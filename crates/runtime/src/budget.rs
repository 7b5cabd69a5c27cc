/// Admission budget for concurrent work.
///
/// Each admitted unit holds one slot until it is released. Unlike a frame
/// budget, slots are returned, so the budget bounds how much work is
/// *in flight* rather than how much runs per tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SlotBudget {
    max: usize,
    in_use: usize,
}

impl SlotBudget {
    pub fn new(max: usize) -> Self {
        Self { max, in_use: 0 }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn available(&self) -> usize {
        self.max.saturating_sub(self.in_use)
    }

    pub fn is_saturated(&self) -> bool {
        self.in_use >= self.max
    }

    /// Takes a slot if one is free.
    pub fn try_acquire(&mut self) -> bool {
        if self.is_saturated() {
            return false;
        }
        self.in_use += 1;
        true
    }

    /// Returns a slot. Releasing with nothing held is a no-op.
    pub fn release(&mut self) {
        self.in_use = self.in_use.saturating_sub(1);
    }
}
