/// Logical timestamp in milliseconds.
///
/// All timers in the workspace take `Millis` explicitly instead of reading a
/// clock, so throttling and debouncing can be replayed in tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    /// Milliseconds elapsed since `earlier`, or 0 if `earlier` is in the future.
    pub fn saturating_since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn plus(self, ms: u64) -> Millis {
        Millis(self.0.saturating_add(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::Millis;

    #[test]
    fn since_saturates_at_zero() {
        assert_eq!(Millis(50).saturating_since(Millis(20)), 30);
        assert_eq!(Millis(20).saturating_since(Millis(50)), 0);
    }

    #[test]
    fn plus_advances() {
        assert_eq!(Millis(10).plus(16), Millis(26));
        assert_eq!(Millis(u64::MAX).plus(1), Millis(u64::MAX));
    }
}
