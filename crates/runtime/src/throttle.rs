use foundation::time::Millis;

/// Rate limiter with leading and trailing edges.
///
/// The first trigger in a quiet period fires immediately. Triggers inside the
/// interval are coalesced into one pending fire that `poll` delivers once the
/// interval has elapsed, so the last trigger of a burst is never lost.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: u64,
    last_fire: Option<Millis>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fire: None,
            pending: false,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns `true` if the caller may act now.
    pub fn trigger(&mut self, now: Millis) -> bool {
        if self.ready(now) {
            self.fire(now);
            return true;
        }
        self.pending = true;
        false
    }

    /// Delivers a coalesced trailing fire, if one is due.
    pub fn poll(&mut self, now: Millis) -> bool {
        if self.pending && self.ready(now) {
            self.fire(now);
            return true;
        }
        false
    }

    fn ready(&self, now: Millis) -> bool {
        match self.last_fire {
            None => true,
            Some(last) => now.saturating_since(last) >= self.interval_ms,
        }
    }

    fn fire(&mut self, now: Millis) {
        self.last_fire = Some(now);
        self.pending = false;
    }
}

/// Fires once after `delay_ms` without any `poke`.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay_ms: u64,
    deadline: Option<Millis>,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// (Re)arms the timer relative to `now`.
    pub fn poke(&mut self, now: Millis) {
        self.deadline = Some(now.plus(self.delay_ms));
    }

    /// Returns `true` exactly once per quiet period.
    pub fn fire_due(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
